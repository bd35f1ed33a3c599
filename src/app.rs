//! 数字分類サービス
//!
//! 設定と分類器アダプタを保持し、入力元ごとの入口を提供します。
//! 構築後は不変で、すべてのメソッドは `&self` で動作します。

use image::{DynamicImage, RgbaImage};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::classifier::{ClassifierAdapter, ScoreModel};
use crate::error::Result;
use crate::input;
use crate::model::AppConfig;
use crate::preprocess::{normalize, NormalizeOptions};
use crate::presentation::{Classification, PredictionView};
use crate::types::{InputSource, NUM_CLASSES};

/// 数字分類サービス
pub struct DigitApp<M: ScoreModel> {
    config: AppConfig,
    classifier: ClassifierAdapter<M>,
}

#[cfg(feature = "ml")]
impl DigitApp<crate::ml::InferenceEngine> {
    /// 設定に従ってモデルを読み込み、サービスを起動
    ///
    /// モデルが読めない場合は致命的エラーとして `Startup` を返す。
    pub fn start(config: AppConfig) -> Result<Self> {
        let model_path = PathBuf::from(&config.model.model_path);
        let engine = crate::ml::InferenceEngine::load(&model_path).map_err(|e| {
            crate::error::ClassifierError::Startup(format!("{}: {:#}", model_path.display(), e))
        })?;
        Ok(Self::new(config, engine))
    }
}

impl<M: ScoreModel> DigitApp<M> {
    /// モデルを注入して作成
    pub fn new(config: AppConfig, model: M) -> Self {
        let classifier = ClassifierAdapter::with_blank_threshold(model, config.thresholds.blank_sum);
        Self { config, classifier }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ClassifierAdapter<M> {
        &self.classifier
    }

    /// 入力元と上書き指定から正規化オプションを決める
    pub fn normalize_options(&self, source: InputSource, invert_override: Option<bool>) -> NormalizeOptions {
        let invert = invert_override.unwrap_or_else(|| self.config.preprocess.invert_for(source));
        NormalizeOptions::from_settings(&self.config.preprocess, invert)
    }

    /// デコード済み画像を正規化して分類
    pub fn classify_image(
        &self,
        image: &DynamicImage,
        source: InputSource,
        invert_override: Option<bool>,
    ) -> Result<Classification> {
        let options = self.normalize_options(source, invert_override);
        let tensor = normalize(image, &options);
        let prediction = self.classifier.predict(&tensor)?;

        if let Some(result) = &prediction {
            if result.is_low_confidence(self.config.thresholds.low_confidence) {
                tracing::debug!(
                    "低信頼度の予測 ({}): {} @ {:.2}",
                    source,
                    result.label,
                    result.confidence
                );
            }
        }

        Ok(Classification {
            source,
            tensor,
            prediction,
        })
    }

    /// 描画キャンバスの最終バッファを分類（反転は設定に従う）
    pub fn classify_drawing(&self, canvas: &RgbaImage) -> Result<Classification> {
        let image = DynamicImage::ImageRgba8(canvas.clone());
        self.classify_image(&image, InputSource::Drawing, None)
    }

    /// 生のRGBAバッファから分類
    pub fn classify_drawing_buffer(&self, width: u32, height: u32, rgba: Vec<u8>) -> Result<Classification> {
        let image = input::decode_canvas_rgba(width, height, rgba)?;
        self.classify_image(&image, InputSource::Drawing, None)
    }

    /// 設定のキャンバスサイズでRGBAバッファを分類
    pub fn classify_canvas_buffer(&self, rgba: Vec<u8>) -> Result<Classification> {
        let canvas = &self.config.canvas;
        self.classify_drawing_buffer(canvas.width, canvas.height, rgba)
    }

    /// ブラウザキャンバスの data URL から分類
    pub fn classify_drawing_data_url(&self, url: &str) -> Result<Classification> {
        let image = input::decode_data_url(url)?;
        self.classify_image(&image, InputSource::Drawing, None)
    }

    /// アップロードされたPNG/JPEGを分類
    pub fn classify_upload(&self, bytes: &[u8], invert_override: Option<bool>) -> Result<Classification> {
        let image = input::decode_upload(bytes)?;
        self.classify_image(&image, InputSource::Upload, invert_override)
    }

    /// 複数の画像ファイルを順番に分類
    ///
    /// 1ファイルの失敗で全体は止めず、ファイルごとの結果を返す。
    pub fn classify_files(
        &self,
        paths: &[PathBuf],
        source: InputSource,
        invert_override: Option<bool>,
    ) -> Vec<(PathBuf, Result<Classification>)> {
        paths
            .iter()
            .map(|path| {
                let result = input::open_image_file(path)
                    .and_then(|image| self.classify_image(&image, source, invert_override));
                if let Err(e) = &result {
                    tracing::warn!("分類に失敗しました {}: {}", path.display(), e);
                }
                (path.clone(), result)
            })
            .collect()
    }

    /// 表示用ペイロードを作成
    pub fn view(&self, classification: &Classification, show_scores: bool) -> Result<PredictionView> {
        PredictionView::from_classification(classification, &self.config.thresholds, show_scores)
    }
}

/// ディレクトリ内の対応画像を列挙（名前順）
pub fn collect_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && input::is_supported_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// 分類結果をCSVで書き出す
///
/// 列: file, label, confidence, p0..p9, error
/// 空入力の行は label 以降を空欄にする。
pub fn write_report_csv<W: Write>(
    results: &[(PathBuf, Result<Classification>)],
    writer: W,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["file".to_string(), "label".to_string(), "confidence".to_string()];
    header.extend((0..NUM_CLASSES).map(|i| format!("p{}", i)));
    header.push("error".to_string());
    csv_writer.write_record(&header)?;

    for (path, result) in results {
        let mut row = vec![path.display().to_string()];
        match result {
            Ok(Classification {
                prediction: Some(prediction),
                ..
            }) => {
                row.push(prediction.label.to_string());
                row.push(format!("{:.6}", prediction.confidence));
                row.extend(prediction.scores.iter().map(|s| format!("{:.6}", s)));
                row.push(String::new());
            }
            Ok(_) => {
                row.extend(std::iter::repeat(String::new()).take(2 + NUM_CLASSES));
                row.push("no input".to_string());
            }
            Err(e) => {
                row.extend(std::iter::repeat(String::new()).take(2 + NUM_CLASSES));
                row.push(e.to_string());
            }
        }
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
