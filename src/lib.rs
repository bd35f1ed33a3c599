pub mod error;
pub mod types;
pub mod model;
pub mod preprocess;
pub mod input;
pub mod classifier;
pub mod presentation;
pub mod app;
mod cli;

// 推論エンジン（Burn）
#[cfg(feature = "ml")]
pub mod ml;

pub use app::DigitApp;
pub use classifier::{ClassifierAdapter, ScoreModel};
pub use error::{ClassifierError, Result};
pub use model::AppConfig;
pub use preprocess::{normalize, NormalizeOptions, NormalizedTensor};
pub use presentation::{Classification, ModelInfo, PredictionView};
pub use types::{InputSource, PredictionResult, NUM_CLASSES};

pub use cli::run;
