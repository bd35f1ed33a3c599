pub mod ml_model;
pub mod inference;

pub use ml_model::{DigitClassifier, ModelConfig};
pub use inference::{InferenceBackend, InferenceEngine};
