//! Encoded frame → raster, on the viewer side.

use image::{ImageFormat, RgbaImage};

use crate::error::GlimpseError;
use crate::screen::frame::EncodedFrame;

/// A fetched frame together with its decoded pixels.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// The payload exactly as it came off the wire.
    pub encoded: EncodedFrame,
    /// Decoded RGBA pixels.
    pub image: RgbaImage,
}

impl DecodedFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode a PNG payload.
///
/// An empty payload is not an error at the protocol level, but it is
/// not an image either; callers check [`EncodedFrame::is_empty`] first.
pub fn decode_png(frame: EncodedFrame) -> Result<DecodedFrame, GlimpseError> {
    if frame.is_empty() {
        return Err(GlimpseError::Decode("empty payload".into()));
    }
    let image = image::load_from_memory_with_format(frame.as_bytes(), ImageFormat::Png)
        .map_err(|e| GlimpseError::Decode(e.to_string()))?
        .to_rgba8();
    Ok(DecodedFrame {
        encoded: frame,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::encoder::{FrameEncoder, PngFrameEncoder};
    use image::Rgba;

    #[test]
    fn decodes_encoder_output() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([1, 2, 3, 255]));
        let frame = PngFrameEncoder::new().encode(&img).unwrap();
        let decoded = decode_png(frame).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
        assert_eq!(decoded.image.get_pixel(5, 5), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn empty_payload_is_rejected() {
        let err = decode_png(EncodedFrame::new(Vec::new())).unwrap_err();
        assert!(matches!(err, GlimpseError::Decode(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = decode_png(EncodedFrame::new(&b"not a png"[..])).unwrap_err();
        assert!(matches!(err, GlimpseError::Decode(_)));
    }
}
