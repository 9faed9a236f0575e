//! Image normalization for vision models.
//!
//! Arbitrary input bytes (PNG, WebP, GIF, BMP, JPEG) are decoded, scaled down
//! to fit the configured bounds, flattened onto a white background and
//! re-encoded as JPEG. A JPEG that already satisfies every constraint is
//! passed through untouched, so `normalize(normalize(x)) == normalize(x)`.

use std::io::Cursor;

use image::{
    codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView, ImageFormat,
    ImageReader, Rgb, RgbImage,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    encoding::encode_base64,
    error::{MultiModalError, MultiModalResult},
};

pub const NORMALIZED_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
    /// Upper bound on raw input size in bytes.
    pub max_input_bytes: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            jpeg_quality: 85,
            max_input_bytes: 10 * 1024 * 1024,
        }
    }
}

/// An image in the form the model gateway sends upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Base64 encoded image bytes (no `data:` prefix).
    pub data: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: NormalizerConfig,
}

impl ImageNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize raw image bytes into a bounded, base64 encoded JPEG.
    pub fn normalize(&self, raw: &[u8]) -> MultiModalResult<EncodedImage> {
        let bytes = self.normalize_bytes(raw)?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), ImageFormat::Jpeg)
            .into_dimensions()
            .map_err(|e| MultiModalError::Decode(e.to_string()))?;
        Ok(EncodedImage {
            data: encode_base64(&bytes),
            mime_type: NORMALIZED_MIME_TYPE.to_string(),
            width,
            height,
        })
    }

    /// Normalize raw image bytes, returning the JPEG bytes.
    pub fn normalize_bytes(&self, raw: &[u8]) -> MultiModalResult<Vec<u8>> {
        if raw.is_empty() {
            return Err(MultiModalError::Empty);
        }
        if raw.len() > self.config.max_input_bytes {
            return Err(MultiModalError::TooLarge {
                size: raw.len(),
                max: self.config.max_input_bytes,
            });
        }

        let format = image::guess_format(raw).map_err(|e| MultiModalError::Decode(e.to_string()))?;
        let img = image::load_from_memory_with_format(raw, format)
            .map_err(|e| MultiModalError::Decode(e.to_string()))?;
        let (width, height) = img.dimensions();

        if format == ImageFormat::Jpeg && !img.color().has_alpha() && self.fits(width, height) {
            debug!(width, height, "Image already normalized, passing through");
            return Ok(raw.to_vec());
        }

        let img = match self.target_size(width, height) {
            Some((w, h)) => {
                debug!(from_w = width, from_h = height, to_w = w, to_h = h, "Resizing image");
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
            None => img,
        };

        let rgb = flatten_onto_white(&img);
        let mut out = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut out, self.config.jpeg_quality);
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| MultiModalError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.config.max_width && height <= self.config.max_height
    }

    /// New dimensions preserving aspect ratio, or `None` if already in bounds.
    fn target_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if self.fits(width, height) {
            return None;
        }
        let aspect = width as f64 / height as f64;
        let (w, h) = if aspect > 1.0 {
            let w = self.config.max_width;
            (w, (w as f64 / aspect) as u32)
        } else {
            let h = self.config.max_height;
            ((h as f64 * aspect) as u32, h)
        };
        Some((w.max(1), h.max(1)))
    }
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::encoding::decode_base64_image;

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_png_converted_to_jpeg() {
        let normalizer = ImageNormalizer::default();
        let encoded = normalizer
            .normalize(&png_bytes(8, 4, Rgba([10, 20, 30, 255])))
            .unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert_eq!((encoded.width, encoded.height), (8, 4));
        let bytes = decode_base64_image(&encoded.data).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_large_landscape_resized_preserving_aspect() {
        let normalizer = ImageNormalizer::new(NormalizerConfig {
            max_width: 64,
            max_height: 64,
            ..Default::default()
        });
        let encoded = normalizer
            .normalize(&png_bytes(256, 128, Rgba([0, 0, 0, 255])))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (64, 32));
    }

    #[test]
    fn test_large_portrait_resized_preserving_aspect() {
        let normalizer = ImageNormalizer::new(NormalizerConfig {
            max_width: 50,
            max_height: 50,
            ..Default::default()
        });
        let encoded = normalizer
            .normalize(&png_bytes(100, 200, Rgba([0, 0, 0, 255])))
            .unwrap();
        assert_eq!((encoded.width, encoded.height), (25, 50));
    }

    #[test]
    fn test_transparency_flattened_onto_white() {
        let normalizer = ImageNormalizer::default();
        let bytes = normalizer
            .normalize_bytes(&png_bytes(4, 4, Rgba([0, 0, 0, 0])))
            .unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let px = img.get_pixel(1, 1).0;
        assert!(px.iter().all(|c| *c > 240), "expected white, got {px:?}");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = ImageNormalizer::default();
        let first = normalizer
            .normalize(&png_bytes(16, 16, Rgba([200, 100, 50, 255])))
            .unwrap();
        let first_bytes = decode_base64_image(&first.data).unwrap();
        let second = normalizer.normalize(&first_bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let normalizer = ImageNormalizer::default();
        let input = png_bytes(12, 7, Rgba([1, 2, 3, 128]));
        assert_eq!(
            normalizer.normalize(&input).unwrap(),
            normalizer.normalize(&input).unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage_empty_and_oversized() {
        let normalizer = ImageNormalizer::new(NormalizerConfig {
            max_input_bytes: 16,
            ..Default::default()
        });
        assert!(matches!(
            normalizer.normalize(b"definitely not an image"),
            Err(MultiModalError::TooLarge { .. })
        ));
        assert!(matches!(normalizer.normalize(b""), Err(MultiModalError::Empty)));
        assert!(matches!(
            normalizer.normalize(b"garbage"),
            Err(MultiModalError::Decode(_))
        ));
    }
}
