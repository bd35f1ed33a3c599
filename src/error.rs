use thiserror::Error;

/// 数字分類コアのエラー型
#[derive(Error, Debug)]
pub enum ClassifierError {
    // 起動時エラー（致命的）
    #[error("Error loading model: {0}")]
    Startup(String),

    // 入力デコードエラー
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid canvas buffer: {0}")]
    Canvas(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    // テンソル契約違反
    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    // 推論エラー
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid score vector: expected {expected} classes, got {actual}")]
    ScoreShape { expected: usize, actual: usize },

    // 出力
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// ClassifierError用のResult型
pub type Result<T> = std::result::Result<T, ClassifierError>;

impl ClassifierError {
    /// 起動を中断すべきエラーかどうか
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClassifierError::Startup(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_is_fatal() {
        let err = ClassifierError::Startup("model.tar.gz not found".to_string());
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Error loading model: model.tar.gz not found");
    }

    #[test]
    fn test_request_errors_are_not_fatal() {
        let err = ClassifierError::ScoreShape { expected: 10, actual: 3 };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("expected 10"));
    }
}
