pub mod normalizer;
pub mod tensor;

pub use normalizer::{invert, normalize, preprocess_image, to_grayscale, NormalizeOptions};
pub use tensor::{NormalizedTensor, TENSOR_LEN, TENSOR_SHAPE};
