//! 分類器アダプタ
//!
//! 空入力を弾き、モデルを1回だけ呼び出し、結果をまとめます。

use crate::error::{ClassifierError, Result};
use crate::model::ThresholdSettings;
use crate::preprocess::NormalizedTensor;
use crate::types::{PredictionResult, NUM_CLASSES};

/// 学習済みモデルの推論能力
///
/// 正規化テンソルを受け取り、10クラスの softmax スコアを返す。
/// 実装は読み取り専用で副作用を持たないこと。
#[cfg_attr(test, mockall::automock)]
pub trait ScoreModel {
    fn scores(&self, input: &NormalizedTensor) -> Result<Vec<f32>>;
}

/// 分類器アダプタ
///
/// 構築後はモデルもしきい値も変更しない。
pub struct ClassifierAdapter<M: ScoreModel> {
    model: M,
    blank_threshold: f32,
}

impl<M: ScoreModel> ClassifierAdapter<M> {
    /// 既定のしきい値 (0.1) で作成
    pub fn new(model: M) -> Self {
        Self::with_blank_threshold(model, ThresholdSettings::default().blank_sum)
    }

    pub fn with_blank_threshold(model: M, blank_threshold: f32) -> Self {
        Self {
            model,
            blank_threshold,
        }
    }

    pub fn blank_threshold(&self) -> f32 {
        self.blank_threshold
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// 空入力判定
    pub fn is_blank(&self, tensor: &NormalizedTensor) -> bool {
        tensor.sum() < self.blank_threshold
    }

    /// 推論を実行
    ///
    /// 空入力なら `Ok(None)` を返し、モデルは呼ばない。
    pub fn predict(&self, tensor: &NormalizedTensor) -> Result<Option<PredictionResult>> {
        debug_assert!(tensor.is_valid(), "NormalizedTensor invariant violated");

        if self.is_blank(tensor) {
            tracing::debug!(
                "空入力のため推論をスキップ: 総和 {:.4} < {}",
                tensor.sum(),
                self.blank_threshold
            );
            return Ok(None);
        }

        let scores = self.model.scores(tensor)?;
        if scores.len() != NUM_CLASSES {
            return Err(ClassifierError::ScoreShape {
                expected: NUM_CLASSES,
                actual: scores.len(),
            });
        }

        let result = PredictionResult::from_scores(scores).ok_or_else(|| {
            ClassifierError::Inference("スコアが空です".to_string())
        })?;

        tracing::debug!(
            "予測: {} (信頼度 {:.2}%)",
            result.label,
            result.confidence * 100.0
        );

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::TENSOR_LEN;

    fn filled(value: f32) -> NormalizedTensor {
        NormalizedTensor::from_vec(vec![value; TENSOR_LEN]).unwrap()
    }

    fn peaked(label: usize, peak: f32) -> Vec<f32> {
        let rest = (1.0 - peak) / (NUM_CLASSES - 1) as f32;
        (0..NUM_CLASSES).map(|i| if i == label { peak } else { rest }).collect()
    }

    #[test]
    fn test_blank_input_skips_model() {
        let mut model = MockScoreModel::new();
        model.expect_scores().times(0);

        let adapter = ClassifierAdapter::new(model);
        assert!(adapter.predict(&filled(0.0)).unwrap().is_none());
    }

    #[test]
    fn test_just_below_threshold_is_blank() {
        let mut model = MockScoreModel::new();
        model.expect_scores().times(0);

        let mut data = vec![0.0; TENSOR_LEN];
        data[0] = 0.05;
        data[1] = 0.04;
        let tensor = NormalizedTensor::from_vec(data).unwrap();

        let adapter = ClassifierAdapter::new(model);
        assert!(adapter.predict(&tensor).unwrap().is_none());
    }

    #[test]
    fn test_prediction_properties() {
        let mut model = MockScoreModel::new();
        model
            .expect_scores()
            .times(1)
            .returning(|_| Ok(peaked(4, 0.82)));

        let adapter = ClassifierAdapter::new(model);
        let result = adapter.predict(&filled(1.0)).unwrap().unwrap();

        assert_eq!(result.label, 4);
        let max = result.scores.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(result.confidence, max);
        let sum: f32 = result.scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn test_wrong_score_length_is_error() {
        let mut model = MockScoreModel::new();
        model.expect_scores().returning(|_| Ok(vec![0.5, 0.5]));

        let adapter = ClassifierAdapter::new(model);
        let err = adapter.predict(&filled(0.5)).unwrap_err();
        assert!(matches!(err, ClassifierError::ScoreShape { expected: 10, actual: 2 }));
    }

    #[test]
    fn test_model_failure_propagates() {
        let mut model = MockScoreModel::new();
        model
            .expect_scores()
            .returning(|_| Err(ClassifierError::Inference("backend down".to_string())));

        let adapter = ClassifierAdapter::new(model);
        assert!(matches!(
            adapter.predict(&filled(0.5)),
            Err(ClassifierError::Inference(_))
        ));
    }

    #[test]
    fn test_custom_blank_threshold() {
        let mut model = MockScoreModel::new();
        model.expect_scores().times(0);

        let adapter = ClassifierAdapter::with_blank_threshold(model, 1000.0);
        assert!(adapter.is_blank(&filled(1.0)));
        assert!(adapter.predict(&filled(1.0)).unwrap().is_none());
    }
}
