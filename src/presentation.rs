//! 表示層に渡すデータ
//!
//! 画面の描画そのものは外部の責務で、ここでは表示に必要な値と
//! 警告文だけを組み立てます。

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{InferenceConfig, ThresholdSettings};
use crate::preprocess::NormalizedTensor;
use crate::types::{InputSource, PredictionResult};

/// 入力が空だった場合の警告
pub const NO_INPUT_WARNING: &str = "Please draw a digit or upload a clearer image.";

/// 1リクエスト分の分類結果
#[derive(Debug, Clone)]
pub struct Classification {
    pub source: InputSource,
    pub tensor: NormalizedTensor,
    pub prediction: Option<PredictionResult>,
}

impl Classification {
    pub fn is_blank(&self) -> bool {
        self.prediction.is_none()
    }
}

/// 低信頼度時の警告（入力元ごとに文言が異なる）
pub fn low_confidence_warning(source: InputSource) -> &'static str {
    match source {
        InputSource::Drawing => "Low confidence prediction. Try drawing more clearly.",
        InputSource::Upload => "Low confidence prediction. Try uploading a clearer image.",
    }
}

/// 信頼度をパーセント表記に ("87.25%")
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// 表示用ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub source: InputSource,
    pub label: Option<u8>,
    pub confidence: Option<f32>,
    pub confidence_text: Option<String>,
    pub low_confidence: bool,
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<BTreeMap<String, f32>>,
    pub input_shape: [usize; 4],
    pub preview_png_base64: String,
}

impl PredictionView {
    /// 分類結果から表示用ペイロードを作成
    ///
    /// `show_scores` が true のときだけ生スコアを含める。
    pub fn from_classification(
        classification: &Classification,
        thresholds: &ThresholdSettings,
        show_scores: bool,
    ) -> crate::error::Result<Self> {
        let preview_png_base64 = classification.tensor.preview_png_base64()?;
        let input_shape = classification.tensor.shape();
        let source = classification.source;

        let view = match &classification.prediction {
            None => Self {
                source,
                label: None,
                confidence: None,
                confidence_text: None,
                low_confidence: false,
                warning: Some(NO_INPUT_WARNING.to_string()),
                scores: None,
                input_shape,
                preview_png_base64,
            },
            Some(result) => {
                let low_confidence = result.is_low_confidence(thresholds.low_confidence);
                let scores = show_scores.then(|| {
                    result
                        .scores
                        .iter()
                        .enumerate()
                        .map(|(i, s)| (i.to_string(), *s))
                        .collect()
                });

                Self {
                    source,
                    label: Some(result.label),
                    confidence: Some(result.confidence),
                    confidence_text: Some(format_confidence(result.confidence)),
                    low_confidence,
                    warning: low_confidence.then(|| low_confidence_warning(source).to_string()),
                    scores,
                    input_shape,
                    preview_png_base64,
                }
            }
        };

        Ok(view)
    }

    /// ターミナル向けの要約
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Input shape: {:?}", self.input_shape));
        if let (Some(label), Some(text)) = (self.label, &self.confidence_text) {
            lines.push(format!("Predicted Digit: {}", label));
            lines.push(format!("Confidence: {}", text));
        }
        if let Some(warning) = &self.warning {
            lines.push(format!("Warning: {}", warning));
        }
        if let Some(scores) = &self.scores {
            for (digit, score) in scores {
                lines.push(format!("  {}: {:.6}", digit, score));
            }
        }
        lines.join("\n")
    }
}

/// モデル情報（サイドバー表示用）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub model: String,
    pub input_shape: (usize, usize, usize),
    pub output: String,
}

impl ModelInfo {
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            model: config.description.clone(),
            input_shape: config.input_shape(),
            output: format!("{}-class softmax", config.num_classes()),
        }
    }
}
