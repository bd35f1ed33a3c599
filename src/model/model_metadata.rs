//! モデルメタデータの定義
//!
//! tar.gz形式のモデルアーカイブに同梱され、推論時の入力形状と
//! クラスラベルの検証に使います。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::NUM_CLASSES;

/// モデル入力の画像サイズ（正方形）
pub const MODEL_INPUT_SIZE: u32 = 28;

/// モデル入力のチャネル数（グレースケール）
pub const MODEL_INPUT_CHANNELS: u32 = 1;

/// モデルメタデータ
///
/// tar.gz形式で保存される情報：
/// - metadata.json: このメタデータ（JSON形式）
/// - model.bin: モデルの重み（バイナリ）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    /// クラスラベル（出力インデックス順）
    /// 例: ["0", "1", ..., "9"]
    pub class_labels: Vec<String>,

    /// モデル入力サイズ（28x28）
    pub image_size: u32,

    /// 入力チャネル数（1）
    pub channels: u32,

    /// モデルの説明
    #[serde(default)]
    pub description: String,

    /// アーカイブ作成時刻（ISO8601形式）
    pub created_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(class_labels: Vec<String>, image_size: u32, channels: u32, description: String) -> Self {
        let created_at = chrono::Local::now().to_rfc3339();

        Self {
            class_labels,
            image_size,
            channels,
            description,
            created_at,
        }
    }

    /// MNIST用の標準メタデータ
    pub fn mnist(description: &str) -> Self {
        let labels = (0..NUM_CLASSES).map(|d| d.to_string()).collect();
        Self::new(labels, MODEL_INPUT_SIZE, MODEL_INPUT_CHANNELS, description.to_string())
    }

    /// クラス数
    pub fn num_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// 入力形状 (batch, height, width, channels)
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.image_size as usize, self.image_size as usize, self.channels as usize]
    }

    /// このクレートの正規化テンソルと互換か検証
    pub fn validate(&self) -> Result<()> {
        if self.image_size != MODEL_INPUT_SIZE || self.channels != MODEL_INPUT_CHANNELS {
            anyhow::bail!(
                "モデル入力形状が不正です: {}x{}x{} (期待: {}x{}x{})",
                self.image_size,
                self.image_size,
                self.channels,
                MODEL_INPUT_SIZE,
                MODEL_INPUT_SIZE,
                MODEL_INPUT_CHANNELS
            );
        }
        if self.num_classes() != NUM_CLASSES {
            anyhow::bail!(
                "クラス数が不正です: {} (期待: {})",
                self.num_classes(),
                NUM_CLASSES
            );
        }
        Ok(())
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnist_metadata_is_valid() {
        let metadata = ModelMetadata::mnist("CNN trained on MNIST");
        assert!(metadata.validate().is_ok());
        assert_eq!(metadata.input_shape(), [1, 28, 28, 1]);
        assert_eq!(metadata.class_labels[3], "3");
    }

    #[test]
    fn test_validate_rejects_rgb_input() {
        let mut metadata = ModelMetadata::mnist("rgb");
        metadata.channels = 3;
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_class_count() {
        let mut metadata = ModelMetadata::mnist("letters");
        metadata.class_labels.push("A".to_string());
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let metadata = ModelMetadata::mnist("CNN trained on MNIST");
        let json = metadata.to_json_string().unwrap();
        assert_eq!(ModelMetadata::from_json_string(&json).unwrap(), metadata);
    }
}
