//! 正規化済み入力テンソル

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

use crate::error::{ClassifierError, Result};
use crate::model::MODEL_INPUT_SIZE;

/// テンソル形状 (batch, height, width, channels)
pub const TENSOR_SHAPE: [usize; 4] = [1, MODEL_INPUT_SIZE as usize, MODEL_INPUT_SIZE as usize, 1];

/// テンソルの要素数 (28 * 28)
pub const TENSOR_LEN: usize = (MODEL_INPUT_SIZE * MODEL_INPUT_SIZE) as usize;

/// 分類器への入力テンソル
///
/// 形状は常に (1, 28, 28, 1)、値は [0.0, 1.0]。
/// チャネルが1なので NHWC と NCHW のメモリ配置は一致する。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
}

impl NormalizedTensor {
    /// 値を検証してテンソルを作成
    pub fn from_vec(data: Vec<f32>) -> Result<Self> {
        if data.len() != TENSOR_LEN {
            return Err(ClassifierError::InvalidTensor(format!(
                "expected {} values (shape {:?}), got {}",
                TENSOR_LEN,
                TENSOR_SHAPE,
                data.len()
            )));
        }
        if let Some((i, v)) = data
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(ClassifierError::InvalidTensor(format!(
                "value {} at index {} is outside [0.0, 1.0]",
                v, i
            )));
        }
        Ok(Self { data })
    }

    /// 28x28グレースケール画像から作成（255で割って正規化）
    pub(crate) fn from_luma(image: &GrayImage) -> Self {
        debug_assert_eq!(image.dimensions(), (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE));
        let data = image.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self { data }
    }

    pub fn shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// 全要素の総和（空入力判定に使う）
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// (y, x) の値
    pub fn get(&self, y: usize, x: usize) -> Option<f32> {
        let size = MODEL_INPUT_SIZE as usize;
        if y >= size || x >= size {
            return None;
        }
        self.data.get(y * size + x).copied()
    }

    /// 形状と値域の不変条件を満たしているか
    pub fn is_valid(&self) -> bool {
        self.data.len() == TENSOR_LEN && self.data.iter().all(|v| (0.0..=1.0).contains(v))
    }

    /// 確認表示用に28x28のグレースケール画像へ戻す
    pub fn to_preview_image(&self) -> GrayImage {
        GrayImage::from_fn(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, |x, y| {
            let v = self.data[(y * MODEL_INPUT_SIZE + x) as usize];
            Luma([(v * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }

    /// プレビュー画像をPNGにしてbase64で返す
    pub fn preview_png_base64(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.to_preview_image()
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(STANDARD.encode(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_accepts_valid() {
        let tensor = NormalizedTensor::from_vec(vec![0.5; TENSOR_LEN]).unwrap();
        assert_eq!(tensor.shape(), [1, 28, 28, 1]);
        assert!((tensor.sum() - 392.0).abs() < 1e-3);
        assert!(tensor.is_valid());
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let err = NormalizedTensor::from_vec(vec![0.0; 100]).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidTensor(_)));
    }

    #[test]
    fn test_from_vec_rejects_out_of_range() {
        let mut data = vec![0.0; TENSOR_LEN];
        data[10] = 1.5;
        assert!(NormalizedTensor::from_vec(data.clone()).is_err());
        data[10] = f32::NAN;
        assert!(NormalizedTensor::from_vec(data).is_err());
    }

    #[test]
    fn test_get_row_major() {
        let mut data = vec![0.0; TENSOR_LEN];
        data[2 * 28 + 5] = 1.0;
        let tensor = NormalizedTensor::from_vec(data).unwrap();
        assert_eq!(tensor.get(2, 5), Some(1.0));
        assert_eq!(tensor.get(5, 2), Some(0.0));
        assert_eq!(tensor.get(28, 0), None);
    }

    #[test]
    fn test_preview_roundtrip_pixels() {
        let image = GrayImage::from_fn(28, 28, |x, y| Luma([((x + y) * 4) as u8]));
        let tensor = NormalizedTensor::from_luma(&image);
        assert_eq!(tensor.to_preview_image(), image);
    }

    #[test]
    fn test_preview_png_base64_decodes() {
        let tensor = NormalizedTensor::from_vec(vec![0.25; TENSOR_LEN]).unwrap();
        let encoded = tensor.preview_png_base64().unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (28, 28));
    }
}
