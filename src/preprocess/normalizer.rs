//! 入力画像の正規化
//!
//! 任意サイズ・任意カラーモードの画像を分類器の入力テンソル
//! (1, 28, 28, 1)、値域 [0.0, 1.0] に変換します。
//!
//! 処理順:
//! 1. グレースケール化（アルファは白背景に合成）
//! 2. 28x28 へリサイズ
//! 3. ガウスぼかし（任意）
//! 4. 輝度反転（任意、入力元ごとに設定）
//! 5. 255で割って [0.0, 1.0] へ
//! 6. (1, 28, 28, 1) へ整形

use image::{imageops, DynamicImage, GrayImage, Rgb, RgbImage};

use crate::model::{PreprocessSettings, ResampleFilter, MODEL_INPUT_SIZE};
use crate::preprocess::tensor::NormalizedTensor;

/// 正規化オプション
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// 輝度を反転するか（白地に黒の手書きは true）
    pub invert: bool,
    /// ガウスぼかしのシグマ（None または 0 以下で無効）
    pub blur_sigma: Option<f32>,
    /// リサンプリングフィルタ
    pub filter: ResampleFilter,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            invert: true,
            blur_sigma: Some(1.0),
            filter: ResampleFilter::default(),
        }
    }
}

impl NormalizeOptions {
    /// 設定ファイルの前処理設定と反転フラグから作成
    pub fn from_settings(settings: &PreprocessSettings, invert: bool) -> Self {
        Self {
            invert,
            blur_sigma: settings.blur_sigma,
            filter: settings.resample_filter,
        }
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn without_blur(mut self) -> Self {
        self.blur_sigma = None;
        self
    }

    fn effective_sigma(&self) -> Option<f32> {
        self.blur_sigma.filter(|s| s.is_finite() && *s > 0.0)
    }
}

/// 画像をグレースケールに変換
///
/// アルファ付きの画像は白背景に合成してから輝度を取る。
/// 透明なキャンバス画素は白紙として扱われる。
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    if !image.color().has_alpha() {
        return image.to_luma8();
    }

    let rgba = image.to_rgba8();
    let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    });
    DynamicImage::ImageRgb8(flattened).to_luma8()
}

/// 輝度を反転 (v -> 255 - v)
pub fn invert(image: &mut GrayImage) {
    imageops::invert(image);
}

/// 手順1〜4を適用した28x28のグレースケール画像を返す
pub fn preprocess_image(image: &DynamicImage, options: &NormalizeOptions) -> GrayImage {
    let gray = to_grayscale(image);

    let mut resized = imageops::resize(&gray, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, options.filter.into());

    if let Some(sigma) = options.effective_sigma() {
        resized = imageops::blur(&resized, sigma);
    }

    if options.invert {
        invert(&mut resized);
    }

    resized
}

/// 画像を分類器の入力テンソルへ正規化
///
/// 入力は1x1以上であれば任意。デコード済みの画像を受け取るので失敗しない。
pub fn normalize(image: &DynamicImage, options: &NormalizeOptions) -> NormalizedTensor {
    let processed = preprocess_image(image, options);
    let tensor = NormalizedTensor::from_luma(&processed);

    tracing::debug!(
        "正規化完了: 入力 {}x{} ({:?}) -> {:?}, 総和 {:.3}",
        image.width(),
        image.height(),
        image.color(),
        tensor.shape(),
        tensor.sum()
    );

    tensor
}
