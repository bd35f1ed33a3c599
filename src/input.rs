//! 入力画像のデコード
//!
//! 描画キャンバスのRGBAバッファ、ブラウザの data URL、
//! アップロードされたPNG/JPEGバイト列を `DynamicImage` に変換します。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

use crate::error::{ClassifierError, Result};

/// キャンバスのRGBAバッファから画像を作成
///
/// バッファ長は `width * height * 4` と一致する必要がある。
pub fn decode_canvas_rgba(width: u32, height: u32, bytes: Vec<u8>) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(ClassifierError::Canvas(format!(
            "キャンバスサイズが不正です: {}x{}",
            width, height
        )));
    }

    let expected = width as usize * height as usize * 4;
    if bytes.len() != expected {
        return Err(ClassifierError::Canvas(format!(
            "バッファ長が一致しません: {} (期待: {}x{}x4 = {})",
            bytes.len(),
            width,
            height,
            expected
        )));
    }
    let rgba = RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| ClassifierError::Canvas(format!("キャンバスを作成できません: {}x{}", width, height)))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

/// `data:image/png;base64,...` 形式の文字列から画像を作成
///
/// プレフィックスが無い場合は全体をbase64として扱う。
pub fn decode_data_url(url: &str) -> Result<DynamicImage> {
    let payload = match url.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => {
            if !header.ends_with(";base64") {
                return Err(ClassifierError::UnsupportedFormat(format!(
                    "base64以外のdata URLには対応していません: {}",
                    header
                )));
            }
            data
        }
        _ => url,
    };

    let bytes = STANDARD.decode(payload.trim())?;
    decode_upload(&bytes)
}

/// アップロードされたPNG/JPEGバイト列をデコード
pub fn decode_upload(bytes: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(bytes)
        .map_err(|_| ClassifierError::UnsupportedFormat("画像形式を判別できません".to_string()))?;

    match format {
        ImageFormat::Png | ImageFormat::Jpeg => {}
        other => {
            return Err(ClassifierError::UnsupportedFormat(format!(
                "{:?} (PNG/JPEGのみ対応)",
                other
            )))
        }
    }

    let image = image::load_from_memory_with_format(bytes, format)?;
    tracing::debug!(
        "アップロード画像をデコードしました: {:?} {}x{}",
        format,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// 画像ファイルを読み込む（拡張子ではなく中身で形式を判定）
pub fn open_image_file(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path)?;
    decode_upload(&bytes)
}

/// 対応拡張子か（ディレクトリ走査用）
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "png" || ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn test_decode_canvas_rgba() {
        let image = decode_canvas_rgba(280, 280, vec![255; 280 * 280 * 4]).unwrap();
        assert_eq!((image.width(), image.height()), (280, 280));
        assert!(image.color().has_alpha());
    }

    #[test]
    fn test_decode_canvas_wrong_length() {
        let err = decode_canvas_rgba(280, 280, vec![0; 100]).unwrap_err();
        assert!(matches!(err, ClassifierError::Canvas(_)));

        // 長すぎるバッファも切り捨てずに拒否する
        let err = decode_canvas_rgba(2, 2, vec![255; 20]).unwrap_err();
        assert!(matches!(err, ClassifierError::Canvas(_)));
        assert!(decode_canvas_rgba(2, 2, vec![255; 16]).is_ok());
    }

    #[test]
    fn test_decode_canvas_zero_size() {
        assert!(decode_canvas_rgba(0, 10, Vec::new()).is_err());
    }

    #[test]
    fn test_decode_png_upload() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(28, 28, Luma([12])));
        let decoded = decode_upload(&encode(&image, ImageFormat::Png)).unwrap();
        assert_eq!(decoded.to_luma8().get_pixel(3, 3).0[0], 12);
    }

    #[test]
    fn test_decode_jpeg_upload() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(16, 16, image::Rgb([0, 0, 0])));
        let decoded = decode_upload(&encode(&image, ImageFormat::Jpeg)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
    }

    #[test]
    fn test_reject_unsupported_format() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([0])));
        let bmp = encode(&image, ImageFormat::Bmp);
        assert!(matches!(decode_upload(&bmp), Err(ClassifierError::UnsupportedFormat(_))));
        assert!(matches!(decode_upload(b"hello"), Err(ClassifierError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_corrupt_png_is_decode_error() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(28, 28, Luma([0])));
        let mut png = encode(&image, ImageFormat::Png);
        png.truncate(40);
        assert!(matches!(decode_upload(&png), Err(ClassifierError::Decode(_))));
    }

    #[test]
    fn test_decode_data_url() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 12, Luma([99])));
        let url = format!("data:image/png;base64,{}", STANDARD.encode(encode(&image, ImageFormat::Png)));
        let decoded = decode_data_url(&url).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 12));
    }

    #[test]
    fn test_decode_data_url_bad_base64() {
        let err = decode_data_url("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, ClassifierError::Base64(_)));
    }

    #[test]
    fn test_supported_extension() {
        assert!(is_supported_extension(Path::new("a/b/seven.PNG")));
        assert!(is_supported_extension(Path::new("x.jpeg")));
        assert!(!is_supported_extension(Path::new("x.gif")));
        assert!(!is_supported_extension(Path::new("noext")));
    }
}
