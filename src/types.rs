use serde::{Deserialize, Serialize};

/// 分類クラス数（数字 0-9）
pub const NUM_CLASSES: usize = 10;

/// 入力の取得元
///
/// 反転の既定値と低信頼度時の警告文がこれで決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// キャンバスへの手書き（白地に黒いストローク）
    Drawing,
    /// アップロードされた画像ファイル
    Upload,
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Drawing => write!(f, "drawing"),
            InputSource::Upload => write!(f, "upload"),
        }
    }
}

/// 1回の推論結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 予測ラベル (0-9)
    pub label: u8,
    /// 最大スコア
    pub confidence: f32,
    /// softmax スコア（10要素）
    pub scores: Vec<f32>,
}

impl PredictionResult {
    /// スコアベクトルから結果を組み立てる
    ///
    /// 最大値が複数ある場合は先頭のインデックスを採用する。
    /// 空のベクトルには `None` を返す。
    pub fn from_scores(scores: Vec<f32>) -> Option<Self> {
        let (index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            })?;

        Some(Self {
            label: index as u8,
            confidence,
            scores,
        })
    }

    /// 信頼度がしきい値未満か
    pub fn is_low_confidence(&self, threshold: f32) -> bool {
        self.confidence < threshold
    }
}
