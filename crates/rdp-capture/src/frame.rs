//! Captured frame representation and grayscale conversion.

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel, blue-green-red order (what the screen capture
    /// collaborator is assumed to hand back).
    Bgr,
    /// 4 bytes per pixel, blue-green-red-alpha order.
    Bgra,
}

impl PixelFormat {
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgr => 3,
            Self::Bgra => 4,
        }
    }
}

/// A single captured video frame: plain pixels with explicit
/// stride/channel information, so PNG encoding and diffing stay pure
/// functions over this type.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw pixel data, top-to-bottom row order.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Row stride in bytes; equals `width * bytes_per_pixel()` for tightly
    /// packed buffers.
    pub stride: u32,
}

impl CapturedFrame {
    #[must_use]
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = width * format.bytes_per_pixel() as u32;
        Self {
            data,
            width,
            height,
            format,
            stride,
        }
    }

    #[must_use]
    pub fn pixel_volume(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Convert to single-channel grayscale using standard luma
    /// (`0.299 R + 0.587 G + 0.114 B`).
    #[must_use]
    pub fn to_grayscale(&self) -> GrayFrame {
        let bpp = self.format.bytes_per_pixel();
        let mut pixels = Vec::with_capacity((self.width * self.height) as usize);
        for row in 0..self.height {
            let row_start = (row * self.stride) as usize;
            for col in 0..self.width {
                let px = row_start + col as usize * bpp;
                let b = f32::from(self.data[px]);
                let g = f32::from(self.data[px + 1]);
                let r = f32::from(self.data[px + 2]);
                let luma = 0.114 * b + 0.587 * g + 0.299 * r;
                pixels.push(luma.round().clamp(0.0, 255.0) as u8);
            }
        }
        GrayFrame {
            pixels,
            width: self.width,
            height: self.height,
        }
    }

    /// Copy out the pixels within `rect`, still in the frame's original
    /// color format. Used to build one delta slice's body before PNG
    /// encoding.
    #[must_use]
    pub fn sub_rect(&self, rect: Rect) -> CapturedFrame {
        let bpp = self.format.bytes_per_pixel();
        let mut data = Vec::with_capacity((rect.width * rect.height) as usize * bpp);
        for row in rect.y..rect.y + rect.height {
            let row_start = (row * self.stride) as usize + rect.x as usize * bpp;
            data.extend_from_slice(&self.data[row_start..row_start + rect.width as usize * bpp]);
        }
        CapturedFrame::new(data, rect.width, rect.height, self.format)
    }
}

/// A single-channel grayscale frame, used only for inter-frame diffing.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl GrayFrame {
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// A dirty rectangle, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_of_solid_red_is_uniform() {
        // 2x1 BGR frame, pure red (B=0, G=0, R=255).
        let frame = CapturedFrame::new(vec![0, 0, 255, 0, 0, 255], 2, 1, PixelFormat::Bgr);
        let gray = frame.to_grayscale();
        assert_eq!(gray.pixels, vec![76, 76]); // round(0.299 * 255)
    }

    #[test]
    fn sub_rect_extracts_expected_pixels() {
        // 3x2 BGR frame, row-major; extract the (1,1)-(2,2) pixel.
        let mut data = vec![0u8; 3 * 2 * 3];
        let idx = (1 * 3 + 1) * 3;
        data[idx..idx + 3].copy_from_slice(&[10, 20, 30]);
        let frame = CapturedFrame::new(data, 3, 2, PixelFormat::Bgr);
        let sub = frame.sub_rect(Rect::new(1, 1, 1, 1));
        assert_eq!(sub.data, vec![10, 20, 30]);
    }
}
