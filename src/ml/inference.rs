//! モデル推論機能

use anyhow::Result;
use std::path::{Path, PathBuf};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
    tensor::Tensor,
};
use burn_ndarray::{NdArray, NdArrayDevice};

use crate::classifier::ScoreModel;
use crate::error::ClassifierError;
use crate::ml::{DigitClassifier, ModelConfig};
use crate::model::{load_model_with_metadata, save_model_with_metadata, InferenceConfig, ModelMetadata};
use crate::preprocess::NormalizedTensor;

/// 推論に使うバックエンド（CPU）
pub type InferenceBackend = NdArray;

/// 推論エンジン
///
/// 起動時に1回だけ読み込み、以後は読み取り専用で使う。
pub struct InferenceEngine {
    model: DigitClassifier<InferenceBackend>,
    metadata: ModelMetadata,
    config: InferenceConfig,
    device: NdArrayDevice,
}

impl InferenceEngine {
    /// モデルアーカイブを読み込んで推論エンジンを初期化
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let (metadata, model_binary) = load_model_with_metadata(model_path)?;
        metadata.validate()?;

        let device = NdArrayDevice::default();
        let model = Self::model_config(&metadata).init::<InferenceBackend>(&device)?;

        // モデルの重みを復元
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record = recorder
            .load(model_binary, &device)
            .map_err(|e| anyhow::anyhow!("モデル重みの読み込みエラー: {:?}", e))?;
        let model = model.load_record(record);

        tracing::info!(
            "モデルを読み込みました: {} ({}, 入力 {:?})",
            model_path.display(),
            metadata.description,
            metadata.input_shape()
        );

        Ok(Self::from_parts(model, metadata, device))
    }

    /// 未学習（ランダム初期化）のエンジンを作成
    ///
    /// アーカイブ形式の確認や動作確認用。
    pub fn untrained(metadata: ModelMetadata) -> Result<Self> {
        metadata.validate()?;
        let device = NdArrayDevice::default();
        let model = Self::model_config(&metadata).init::<InferenceBackend>(&device)?;
        Ok(Self::from_parts(model, metadata, device))
    }

    fn from_parts(model: DigitClassifier<InferenceBackend>, metadata: ModelMetadata, device: NdArrayDevice) -> Self {
        let config = InferenceConfig::from_metadata(&metadata);
        Self {
            model,
            metadata,
            config,
            device,
        }
    }

    fn model_config(metadata: &ModelMetadata) -> ModelConfig {
        ModelConfig::new(metadata.num_classes())
            .with_image_size(metadata.image_size as usize)
            .with_channels(metadata.channels as usize)
    }

    /// 重みとメタデータをtar.gzに保存
    pub fn save<P: AsRef<Path>>(&self, output_path: P) -> Result<PathBuf> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let model_binary = Recorder::<InferenceBackend>::record(&recorder, self.model.clone().into_record(), ())
            .map_err(|e| anyhow::anyhow!("モデル重みの書き出しエラー: {:?}", e))?;

        save_model_with_metadata(output_path.as_ref(), &self.metadata, &model_binary)
    }

    /// 正規化済み画素列から softmax スコアを計算
    pub fn predict_scores(&self, pixels: &[f32]) -> Result<Vec<f32>> {
        let (height, width, channels) = self.config.input_shape();
        let expected = height * width * channels;
        if pixels.len() != expected {
            anyhow::bail!("入力サイズが不正です: {} (期待: {})", pixels.len(), expected);
        }

        // Tensorに変換 [1, C, H, W]（C=1 なので NHWC と同じ並び）
        let tensor = Tensor::<InferenceBackend, 1>::from_floats(pixels, &self.device)
            .reshape([1, channels, height, width]);

        let output = self.model.predict_proba(tensor);

        output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("推論結果の取得エラー: {:?}", e))
    }

    /// InferenceConfigへの参照を取得
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

impl ScoreModel for InferenceEngine {
    fn scores(&self, input: &NormalizedTensor) -> crate::error::Result<Vec<f32>> {
        self.predict_scores(input.as_slice())
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::TENSOR_LEN;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("digit_engine_{}_{}.tar.gz", std::process::id(), name))
    }

    fn stroke_tensor() -> NormalizedTensor {
        let data = (0..TENSOR_LEN)
            .map(|i| if i % 28 == 14 { 1.0 } else { 0.0 })
            .collect();
        NormalizedTensor::from_vec(data).unwrap()
    }

    #[test]
    fn test_untrained_scores_are_distribution() {
        let engine = InferenceEngine::untrained(ModelMetadata::mnist("untrained")).unwrap();
        let scores = engine.scores(&stroke_tensor()).unwrap();
        assert_eq!(scores.len(), 10);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_save_and_load_preserves_weights() {
        let engine = InferenceEngine::untrained(ModelMetadata::mnist("roundtrip")).unwrap();
        let path = engine.save(temp_path("roundtrip")).unwrap();

        let loaded = InferenceEngine::load(&path).unwrap();
        assert_eq!(loaded.metadata().description, "roundtrip");

        let input = stroke_tensor();
        let before = engine.scores(&input).unwrap();
        let after = loaded.scores(&input).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-5);
        }

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_incompatible_metadata() {
        let path = temp_path("rgb");
        let mut metadata = ModelMetadata::mnist("rgb");
        metadata.channels = 3;
        save_model_with_metadata(&path, &metadata, &[0u8; 16]).unwrap();

        assert!(InferenceEngine::load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_corrupt_weights() {
        let path = temp_path("corrupt_weights");
        save_model_with_metadata(&path, &ModelMetadata::mnist("bad"), b"not a burn record").unwrap();

        let err = match InferenceEngine::load(&path) {
            Ok(_) => panic!("corrupt weights should not load"),
            Err(e) => e,
        };
        assert!(format!("{:#}", err).contains("モデル重みの読み込みエラー"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_truncated_weights() {
        let engine = InferenceEngine::untrained(ModelMetadata::mnist("truncated")).unwrap();
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let bytes = Recorder::<InferenceBackend>::record(&recorder, engine.model.clone().into_record(), ()).unwrap();

        let path = temp_path("truncated_weights");
        save_model_with_metadata(&path, engine.metadata(), &bytes[..bytes.len() / 2]).unwrap();

        assert!(InferenceEngine::load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        assert!(InferenceEngine::load(temp_path("missing")).is_err());
    }

    #[test]
    fn test_predict_scores_rejects_wrong_length() {
        let engine = InferenceEngine::untrained(ModelMetadata::mnist("len")).unwrap();
        assert!(engine.predict_scores(&[0.0; 10]).is_err());
    }
}
