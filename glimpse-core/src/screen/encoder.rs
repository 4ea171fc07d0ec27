//! Raster → encoded frame.
//!
//! The only wire format is PNG; [`FrameEncoder`] exists so the capture
//! loop can be driven with a failing or instrumented codec in tests.

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::GlimpseError;
use crate::screen::frame::EncodedFrame;

/// Turns a captured raster into the bytes served to viewers.
pub trait FrameEncoder: Send + Sync + 'static {
    fn encode(&self, image: &RgbaImage) -> Result<EncodedFrame, GlimpseError>;

    /// MIME type of the produced payload.
    fn content_type(&self) -> &'static str;
}

/// PNG encoder.
///
/// Defaults to fast compression: a full-screen frame every 500 ms
/// is dominated by deflate time at higher levels.
#[derive(Debug, Clone, Copy)]
pub struct PngFrameEncoder {
    compression: CompressionType,
}

impl PngFrameEncoder {
    pub fn new() -> Self {
        Self::with_compression(CompressionType::Fast)
    }

    pub fn with_compression(compression: CompressionType) -> Self {
        Self { compression }
    }
}

impl Default for PngFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for PngFrameEncoder {
    fn encode(&self, image: &RgbaImage) -> Result<EncodedFrame, GlimpseError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(GlimpseError::Encode(format!(
                "refusing to encode empty {width}x{height} image"
            )));
        }

        // Raw RGBA compresses to roughly a quarter on typical desktops.
        let mut out = Vec::with_capacity(image.as_raw().len() / 4);
        PngEncoder::new_with_quality(Cursor::new(&mut out), self.compression, FilterType::Adaptive)
            .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|e| GlimpseError::Encode(e.to_string()))?;

        Ok(EncodedFrame::new(out))
    }

    fn content_type(&self) -> &'static str {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn produces_png_magic() {
        let img = RgbaImage::from_pixel(32, 16, Rgba([10, 20, 30, 255]));
        let frame = PngFrameEncoder::new().encode(&img).unwrap();
        assert_eq!(&frame.as_bytes()[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn rejects_zero_sized_image() {
        let img = RgbaImage::new(0, 10);
        let err = PngFrameEncoder::new().encode(&img).unwrap_err();
        assert!(matches!(err, GlimpseError::Encode(_)));
    }

    #[test]
    fn best_compression_is_not_larger_than_fast() {
        let img = RgbaImage::from_fn(128, 128, |x, y| Rgba([(x % 7) as u8, (y % 5) as u8, 0, 255]));
        let fast = PngFrameEncoder::with_compression(CompressionType::Fast)
            .encode(&img)
            .unwrap();
        let best = PngFrameEncoder::with_compression(CompressionType::Best)
            .encode(&img)
            .unwrap();
        assert!(best.len() <= fast.len());
    }
}
