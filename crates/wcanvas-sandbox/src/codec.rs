//! PNG wire format shared by guest and host.
//!
//! The guest encodes 8-bit RGBA PNG; the host decodes whatever PNG it gets
//! and normalizes to straight-alpha RGBA8.

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};

use crate::error::{Result, SandboxError};

/// An owned RGBA8 image with straight (non-premultiplied) alpha.
pub type Bitmap = RgbaImage;

/// Decode PNG bytes into a bitmap.
pub fn decode_png(bytes: &[u8]) -> Result<Bitmap> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| SandboxError::Decode(e.to_string()))?;
    Ok(image.into_rgba8())
}

/// Encode a bitmap as 8-bit RGBA PNG.
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            bitmap.as_raw(),
            bitmap.width(),
            bitmap.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| SandboxError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Filled disc with hard edges and a fixed color.
    fn disc(size: u32, color: [u8; 3]) -> Bitmap {
        let r = size as f32 / 2.0;
        RgbaImage::from_fn(size, size, |x, y| {
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            if dx * dx + dy * dy <= r * r {
                Rgba([color[0], color[1], color[2], 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_png_round_trip_keeps_dimensions() {
        let drawn = disc(30, [200, 40, 90]);
        let bytes = encode_png(&drawn).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = decode_png(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (30, 30));
        assert_eq!(decoded, drawn);
        assert_eq!(decoded.get_pixel(15, 15).0, [200, 40, 90, 255]);
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_png(b"definitely not a png").unwrap_err();
        assert!(matches!(err, SandboxError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let bytes = encode_png(&disc(30, [1, 2, 3])).unwrap();
        let err = decode_png(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, SandboxError::Decode(_)));
    }
}
