//! Cursor compositing: alpha-blending a cursor bitmap onto a captured
//! frame. This module defines the capability interface the capture
//! loop calls and a no-op stub suitable for headless operation, plus a
//! real alpha-blend implementation.

use crate::frame::CapturedFrame;

/// RGBA cursor overlay bitmap, decoded once at startup from
/// `curser_point.png`. Decoding the PNG itself is the image codec's
/// job; this struct just carries already-decoded pixels.
#[derive(Debug, Clone)]
pub struct CursorBitmap {
    pub width: u32,
    pub height: u32,
    /// RGBA, 4 bytes per pixel, top-to-bottom row order.
    pub rgba: Vec<u8>,
}

/// Composites `cursor` onto `frame` at `pos`. Out-of-bounds placement
/// is skipped entirely.
pub trait CursorCompositor: Send + Sync {
    fn composite(&self, frame: &mut CapturedFrame, cursor: &CursorBitmap, pos: (i32, i32));
}

/// Does nothing. The default for headless operation, where no real
/// cursor overlay collaborator is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCompositor;

impl CursorCompositor for NoOpCompositor {
    fn composite(&self, _frame: &mut CapturedFrame, _cursor: &CursorBitmap, _pos: (i32, i32)) {}
}

/// Straightforward alpha-over blend, matching the legacy client's
/// `addCurser`. Out-of-bounds cursor placement (any edge of the cursor
/// bitmap falling outside the frame) is skipped rather than clipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlphaBlendCompositor;

impl CursorCompositor for AlphaBlendCompositor {
    fn composite(&self, frame: &mut CapturedFrame, cursor: &CursorBitmap, pos: (i32, i32)) {
        let (x, y) = pos;
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x + cursor.width > frame.width || y + cursor.height > frame.height {
            return;
        }

        let bpp = frame.format.bytes_per_pixel();
        for row in 0..cursor.height {
            for col in 0..cursor.width {
                let cursor_px = ((row * cursor.width + col) * 4) as usize;
                let alpha = f32::from(cursor.rgba[cursor_px + 3]) / 255.0;
                if alpha == 0.0 {
                    continue;
                }
                let (cr, cg, cb) = (
                    cursor.rgba[cursor_px],
                    cursor.rgba[cursor_px + 1],
                    cursor.rgba[cursor_px + 2],
                );

                let frame_row = (y + row) * frame.stride;
                let frame_px = (frame_row + (x + col) * bpp as u32) as usize;
                let (fb, fg, fr) = (
                    frame.data[frame_px],
                    frame.data[frame_px + 1],
                    frame.data[frame_px + 2],
                );

                frame.data[frame_px] = blend(cb, fb, alpha);
                frame.data[frame_px + 1] = blend(cg, fg, alpha);
                frame.data[frame_px + 2] = blend(cr, fr, alpha);
            }
        }
    }
}

fn blend(fg: u8, bg: u8, alpha: f32) -> u8 {
    (alpha * f32::from(fg) + (1.0 - alpha) * f32::from(bg)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    #[test]
    fn opaque_cursor_fully_replaces_pixel() {
        let mut frame = CapturedFrame::new(vec![0, 0, 0], 1, 1, PixelFormat::Bgr);
        let cursor = CursorBitmap {
            width: 1,
            height: 1,
            rgba: vec![10, 20, 30, 255],
        };
        AlphaBlendCompositor.composite(&mut frame, &cursor, (0, 0));
        assert_eq!(frame.data, vec![30, 20, 10]);
    }

    #[test]
    fn out_of_bounds_cursor_is_skipped() {
        let mut frame = CapturedFrame::new(vec![1, 2, 3], 1, 1, PixelFormat::Bgr);
        let cursor = CursorBitmap {
            width: 2,
            height: 2,
            rgba: vec![0xFF; 16],
        };
        AlphaBlendCompositor.composite(&mut frame, &cursor, (0, 0));
        assert_eq!(frame.data, vec![1, 2, 3]);
    }

    #[test]
    fn no_op_compositor_leaves_frame_untouched() {
        let mut frame = CapturedFrame::new(vec![9, 9, 9], 1, 1, PixelFormat::Bgr);
        let cursor = CursorBitmap {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        };
        NoOpCompositor.composite(&mut frame, &cursor, (0, 0));
        assert_eq!(frame.data, vec![9, 9, 9]);
    }
}
