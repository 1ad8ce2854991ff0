//! PNG encoding for keyframe bodies and delta slices.
//!
//! Kept behind a trait so delta-encoder tests can supply a deterministic
//! fake and assert on packet shape without depending on the `image`
//! crate's actual PNG bytes.

use crate::error::CaptureError;
use crate::frame::CapturedFrame;

pub trait SliceEncoder: Send + Sync {
    fn encode_png(&self, frame: &CapturedFrame) -> Result<Vec<u8>, CaptureError>;
}

impl SliceEncoder for Box<dyn SliceEncoder> {
    fn encode_png(&self, frame: &CapturedFrame) -> Result<Vec<u8>, CaptureError> {
        (**self).encode_png(frame)
    }
}

/// Encodes a frame (or slice) as a lossless PNG via the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngSliceEncoder;

impl SliceEncoder for PngSliceEncoder {
    fn encode_png(&self, frame: &CapturedFrame) -> Result<Vec<u8>, CaptureError> {
        let rgb = to_rgb_bytes(frame);
        let image = image::RgbImage::from_raw(frame.width, frame.height, rgb)
            .ok_or_else(|| CaptureError::Encode("pixel buffer size mismatch".to_string()))?;

        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Re-pack a BGR(A) frame into tightly-packed RGB bytes for `image`.
fn to_rgb_bytes(frame: &CapturedFrame) -> Vec<u8> {
    let bpp = frame.format.bytes_per_pixel();
    let mut rgb = Vec::with_capacity((frame.width * frame.height) as usize * 3);
    for row in 0..frame.height {
        let row_start = (row * frame.stride) as usize;
        for col in 0..frame.width {
            let px = row_start + col as usize * bpp;
            let (b, g, r) = (frame.data[px], frame.data[px + 1], frame.data[px + 2]);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }
    rgb
}
