//! アプリケーション設定管理モジュール
//!
//! モデルのパス、前処理パラメータ、しきい値をJSON形式で保存・読み込みします。

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::InputSource;

/// 28x28への縮小に使うリサンプリングフィルタ
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Default for ResampleFilter {
    fn default() -> Self {
        ResampleFilter::CatmullRom
    }
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl std::fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleFilter::Nearest => write!(f, "nearest"),
            ResampleFilter::Triangle => write!(f, "triangle (bilinear)"),
            ResampleFilter::CatmullRom => write!(f, "catmull_rom (bicubic)"),
            ResampleFilter::Gaussian => write!(f, "gaussian"),
            ResampleFilter::Lanczos3 => write!(f, "lanczos3"),
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// 使用するモデルアーカイブ(tar.gz)のパス
    pub model_path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "models/mnist_classifier.tar.gz".to_string(),
        }
    }
}

/// 前処理設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessSettings {
    /// リサンプリングフィルタ
    #[serde(default)]
    pub resample_filter: ResampleFilter,
    /// ガウスぼかしのシグマ（Noneでぼかし無し）
    pub blur_sigma: Option<f32>,
    /// 手書き入力を反転するか
    pub drawing_invert: bool,
    /// アップロード画像を反転するか（リクエストごとに上書き可能）
    pub upload_invert: bool,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            resample_filter: ResampleFilter::default(),
            blur_sigma: Some(1.0),
            drawing_invert: true,
            upload_invert: true,
        }
    }
}

impl PreprocessSettings {
    /// 入力元ごとの反転既定値
    pub fn invert_for(&self, source: InputSource) -> bool {
        match source {
            InputSource::Drawing => self.drawing_invert,
            InputSource::Upload => self.upload_invert,
        }
    }
}

/// しきい値設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSettings {
    /// テンソル総和がこの値未満なら空入力として推論しない
    pub blank_sum: f32,
    /// 信頼度がこの値未満なら低信頼度として警告する
    pub low_confidence: f32,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            blank_sum: 0.1,
            low_confidence: 0.5,
        }
    }
}

/// 描画キャンバス設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 280,
            height: 280,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// モデル設定
    pub model: ModelSettings,
    /// 前処理設定
    #[serde(default)]
    pub preprocess: PreprocessSettings,
    /// しきい値設定
    #[serde(default)]
    pub thresholds: ThresholdSettings,
    /// キャンバス設定
    #[serde(default)]
    pub canvas: CanvasSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 指定パスから設定を読み込む、存在しない・壊れている場合はデフォルト設定を返す
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    tracing::info!("設定ファイルを読み込みました: {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Self::default()
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// モデルパスを設定
    pub fn set_model_path(&mut self, path: String) {
        self.model.model_path = path;
    }

    /// 設定情報を表示
    pub fn display(&self) {
        println!("=== アプリケーション設定 ===");
        println!("モデルパス: {}", self.model.model_path);
        println!("\n--- 前処理設定 ---");
        println!("リサンプリング: {}", self.preprocess.resample_filter);
        match self.preprocess.blur_sigma {
            Some(sigma) => println!("ぼかし: sigma={}", sigma),
            None => println!("ぼかし: 無効"),
        }
        println!("手書き反転: {}", self.preprocess.drawing_invert);
        println!("アップロード反転: {}", self.preprocess.upload_invert);
        println!("\n--- しきい値 ---");
        println!("空入力判定: 総和 < {}", self.thresholds.blank_sum);
        println!("低信頼度: < {}", self.thresholds.low_confidence);
        println!("\n--- キャンバス ---");
        println!("サイズ: {}x{}", self.canvas.width, self.canvas.height);
        println!("========================\n");
    }
}
