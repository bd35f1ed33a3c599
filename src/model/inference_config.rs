//! モデルメタデータから推論に必要な情報を取り出す

use crate::model::model_metadata::ModelMetadata;

/// 推論用設定
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// クラスラベル（出力インデックス順）
    pub class_labels: Vec<String>,

    /// モデル入力解像度
    pub model_input_size: u32,

    /// 入力チャネル数
    pub channels: u32,

    /// モデルの説明
    pub description: String,
}

impl InferenceConfig {
    /// メタデータからInferenceConfigを作成
    pub fn from_metadata(metadata: &ModelMetadata) -> Self {
        Self {
            class_labels: metadata.class_labels.clone(),
            model_input_size: metadata.image_size,
            channels: metadata.channels,
            description: metadata.description.clone(),
        }
    }

    /// クラス数
    pub fn num_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// 入力形状 (height, width, channels)
    pub fn input_shape(&self) -> (usize, usize, usize) {
        (
            self.model_input_size as usize,
            self.model_input_size as usize,
            self.channels as usize,
        )
    }

    /// クラスインデックスからラベルを取得
    pub fn class_index_to_label(&self, index: usize) -> Option<&str> {
        self.class_labels.get(index).map(String::as_str)
    }

    /// 設定情報を表示
    pub fn print_info(&self) {
        println!("\n=== 推論設定 ===");
        println!("モデル: {}", self.description);
        println!("入力形状: {:?}", self.input_shape());
        println!("出力: {}クラス softmax", self.num_classes());
        println!("クラスラベル: {}", self.class_labels.join(", "));
        println!("==================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_metadata() {
        let metadata = ModelMetadata::mnist("CNN trained on MNIST");
        let config = InferenceConfig::from_metadata(&metadata);
        assert_eq!(config.num_classes(), 10);
        assert_eq!(config.input_shape(), (28, 28, 1));
        assert_eq!(config.class_index_to_label(9), Some("9"));
        assert_eq!(config.class_index_to_label(10), None);
    }
}
