//! The delta encoder: turns a pair of frames into a keyframe or a list
//! of dirty-region slices, applying the keyframe-degradation rules.

use std::time::{Duration, Instant};

use rdp_proto::DeltaSlice;

use crate::error::CaptureError;
use crate::frame::{CapturedFrame, GrayFrame, Rect};
use crate::slice_encoder::SliceEncoder;

/// Degradation thresholds; defaults are 30/1s/3000/90%.
#[derive(Debug, Clone, Copy)]
pub struct DegradationThresholds {
    /// Per-pixel grayscale difference above which a pixel counts as dirty.
    pub diff_threshold: u8,
    /// Minimum time between keyframes.
    pub keyframe_interval: Duration,
    /// Above this many dirty regions, fall back to a keyframe.
    pub max_contours: usize,
    /// Above this fraction of the frame's raw pixel volume covered by
    /// dirty slices, fall back to a keyframe.
    pub max_volume_ratio: f64,
}

impl Default for DegradationThresholds {
    fn default() -> Self {
        Self {
            diff_threshold: 30,
            keyframe_interval: Duration::from_secs(1),
            max_contours: 3000,
            max_volume_ratio: 0.90,
        }
    }
}

/// Result of one `encode` call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaResult {
    Keyframe { body: Vec<u8>, width: u32, height: u32 },
    Delta { slices: Vec<DeltaSlice> },
    Empty,
}

/// Stateful frame-differencing encoder. One instance per capture loop;
/// `prev_gray` and `last_keyframe_at` are exclusively owned by it —
/// never shared with the command task.
pub struct DeltaEncoder<E> {
    prev_gray: Option<GrayFrame>,
    last_keyframe_at: Option<Instant>,
    pending_gray: Option<GrayFrame>,
    pending_was_keyframe: bool,
    thresholds: DegradationThresholds,
    encoder: E,
}

impl<E: SliceEncoder> DeltaEncoder<E> {
    #[must_use]
    pub fn new(encoder: E) -> Self {
        Self::with_thresholds(encoder, DegradationThresholds::default())
    }

    #[must_use]
    pub fn with_thresholds(encoder: E, thresholds: DegradationThresholds) -> Self {
        Self {
            prev_gray: None,
            last_keyframe_at: None,
            pending_gray: None,
            pending_was_keyframe: false,
            thresholds,
            encoder,
        }
    }

    /// Encode one captured frame. Does not mutate committed state —
    /// call [`Self::commit`] after a successful channel write, or
    /// [`Self::invalidate`] after a failed one.
    pub fn encode(&mut self, frame: &CapturedFrame) -> Result<DeltaResult, CaptureError> {
        let gray = frame.to_grayscale();

        let result = if self.needs_keyframe_by_time() {
            self.make_keyframe(frame)?
        } else {
            match &self.prev_gray {
                None => self.make_keyframe(frame)?,
                Some(prev) => self.make_delta(frame, prev, &gray)?,
            }
        };

        self.pending_was_keyframe = matches!(result, DeltaResult::Keyframe { .. });
        self.pending_gray = Some(gray);
        Ok(result)
    }

    fn needs_keyframe_by_time(&self) -> bool {
        match self.last_keyframe_at {
            None => true,
            Some(t) => t.elapsed() > self.thresholds.keyframe_interval,
        }
    }

    fn make_keyframe(&self, frame: &CapturedFrame) -> Result<DeltaResult, CaptureError> {
        let body = self.encoder.encode_png(frame)?;
        Ok(DeltaResult::Keyframe {
            body,
            width: frame.width,
            height: frame.height,
        })
    }

    fn make_delta(
        &self,
        frame: &CapturedFrame,
        prev: &GrayFrame,
        curr: &GrayFrame,
    ) -> Result<DeltaResult, CaptureError> {
        let rects = dirty_rects(prev, curr, self.thresholds.diff_threshold);
        if rects.is_empty() {
            return Ok(DeltaResult::Empty);
        }
        if rects.len() > self.thresholds.max_contours {
            return self.make_keyframe(frame);
        }

        let dirty_volume: u64 = rects.iter().map(Rect::area).sum();
        let ratio = dirty_volume as f64 / frame.pixel_volume() as f64;
        if ratio > self.thresholds.max_volume_ratio {
            return self.make_keyframe(frame);
        }

        let mut slices = Vec::with_capacity(rects.len());
        for rect in rects {
            let sub = frame.sub_rect(rect);
            let body = self.encoder.encode_png(&sub)?;
            slices.push(DeltaSlice::new(rect.x, rect.y, rect.width, rect.height, body));
        }
        Ok(DeltaResult::Delta { slices })
    }

    /// Call after the packet from the last `encode()` was fully written.
    pub fn commit(&mut self) {
        if let Some(gray) = self.pending_gray.take() {
            self.prev_gray = Some(gray);
            if self.pending_was_keyframe {
                self.last_keyframe_at = Some(Instant::now());
            }
        }
    }

    /// Call after a write failed (or was never attempted for an `Empty`
    /// result). A partial write invalidates `prev_gray`, forcing the
    /// next frame to be a keyframe.
    pub fn invalidate(&mut self) {
        self.prev_gray = None;
        self.pending_gray = None;
    }

    #[must_use]
    pub fn has_prev_frame(&self) -> bool {
        self.prev_gray.is_some()
    }
}

/// Threshold the absolute grayscale difference and return the bounding
/// rectangle of each 4-connected dirty region — a coarse external-contour
/// approximation via flood fill rather than a full contour hierarchy.
fn dirty_rects(prev: &GrayFrame, curr: &GrayFrame, threshold: u8) -> Vec<Rect> {
    let (w, h) = (curr.width, curr.height);
    let mut dirty = vec![false; (w * h) as usize];
    for i in 0..dirty.len() {
        let diff = i32::from(curr.pixels[i]).abs_diff(i32::from(prev.pixels[i]));
        dirty[i] = diff > u32::from(threshold);
    }

    let mut visited = vec![false; dirty.len()];
    let mut rects = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if !dirty[idx] || visited[idx] {
                continue;
            }

            visited[idx] = true;
            stack.push((x, y));
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

            while let Some((cx, cy)) = stack.pop() {
                min_x = min_x.min(cx);
                max_x = max_x.max(cx);
                min_y = min_y.min(cy);
                max_y = max_y.max(cy);

                for (nx, ny) in four_neighbors(cx, cy, w, h) {
                    let nidx = (ny * w + nx) as usize;
                    if dirty[nidx] && !visited[nidx] {
                        visited[nidx] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            rects.push(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1));
        }
    }

    rects
}

fn four_neighbors(x: u32, y: u32, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    let mut out = Vec::with_capacity(4);
    if x > 0 {
        out.push((x - 1, y));
    }
    if x + 1 < w {
        out.push((x + 1, y));
    }
    if y > 0 {
        out.push((x, y - 1));
    }
    if y + 1 < h {
        out.push((x, y + 1));
    }
    out.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    struct FakeEncoder;
    impl SliceEncoder for FakeEncoder {
        fn encode_png(&self, frame: &CapturedFrame) -> Result<Vec<u8>, CaptureError> {
            // Deterministic stand-in: just the raw bytes, tagged with a
            // marker so tests can tell slices apart without a real codec.
            let mut body = vec![0x89, b'P', b'N', b'G'];
            body.extend_from_slice(&frame.data);
            Ok(body)
        }
    }

    fn solid_frame(w: u32, h: u32, bgr: [u8; 3]) -> CapturedFrame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..(w * h) {
            data.extend_from_slice(&bgr);
        }
        CapturedFrame::new(data, w, h, PixelFormat::Bgr)
    }

    #[test]
    fn first_frame_is_always_a_keyframe() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        let frame = solid_frame(4, 2, [0, 0, 255]);
        match enc.encode(&frame).unwrap() {
            DeltaResult::Keyframe { width, height, .. } => {
                assert_eq!((width, height), (4, 2));
            }
            _ => panic!("expected keyframe"),
        }
    }

    #[test]
    fn identical_frames_after_keyframe_produce_empty() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        let frame = solid_frame(100, 100, [1, 2, 3]);
        enc.encode(&frame).unwrap();
        enc.commit();

        match enc.encode(&frame).unwrap() {
            DeltaResult::Empty => {}
            other => panic!("expected Empty, got {other:?}"),
        }
    }

    #[test]
    fn single_dirty_region_yields_one_slice() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        let base = solid_frame(100, 100, [0, 0, 0]);
        enc.encode(&base).unwrap();
        enc.commit();

        let mut dirty_data = base.data.clone();
        for y in 10..30 {
            for x in 10..30 {
                let idx = ((y * 100 + x) * 3) as usize;
                dirty_data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let dirty_frame = CapturedFrame::new(dirty_data, 100, 100, PixelFormat::Bgr);

        match enc.encode(&dirty_frame).unwrap() {
            DeltaResult::Delta { slices } => {
                assert_eq!(slices.len(), 1);
                assert_eq!((slices[0].x, slices[0].y), (10, 10));
                assert_eq!((slices[0].width, slices[0].height), (20, 20));
            }
            other => panic!("expected a single-slice delta, got {other:?}"),
        }
    }

    #[test]
    fn no_pixel_differs_by_more_than_threshold_emits_nothing() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        let base = solid_frame(50, 50, [100, 100, 100]);
        enc.encode(&base).unwrap();
        enc.commit();

        // Shift every pixel by less than the threshold.
        let mut nearly_same = base.data.clone();
        for b in &mut nearly_same {
            *b = b.saturating_add(10);
        }
        let frame = CapturedFrame::new(nearly_same, 50, 50, PixelFormat::Bgr);
        assert_eq!(enc.encode(&frame).unwrap(), DeltaResult::Empty);
    }

    #[test]
    fn failed_write_forces_next_frame_to_be_keyframe() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        let frame = solid_frame(10, 10, [9, 9, 9]);
        enc.encode(&frame).unwrap();
        enc.commit();
        assert!(enc.has_prev_frame());

        enc.invalidate();
        assert!(!enc.has_prev_frame());

        match enc.encode(&frame).unwrap() {
            DeltaResult::Keyframe { .. } => {}
            other => panic!("expected keyframe after invalidation, got {other:?}"),
        }
    }

    #[test]
    fn elapsed_keyframe_interval_forces_a_keyframe() {
        let mut enc = DeltaEncoder::with_thresholds(
            FakeEncoder,
            DegradationThresholds {
                keyframe_interval: Duration::from_millis(1),
                ..DegradationThresholds::default()
            },
        );
        let frame = solid_frame(10, 10, [1, 1, 1]);
        enc.encode(&frame).unwrap();
        enc.commit();

        std::thread::sleep(Duration::from_millis(5));

        match enc.encode(&frame).unwrap() {
            DeltaResult::Keyframe { .. } => {}
            other => panic!("expected keyframe after interval elapsed, got {other:?}"),
        }
    }

    #[test]
    fn too_many_contours_degrades_to_keyframe() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        // 128x128 checkerboard base so the next frame can flip every
        // other pixel into > 3000 isolated single-pixel regions.
        let w = 128;
        let h = 128;
        let base = solid_frame(w, h, [0, 0, 0]);
        enc.encode(&base).unwrap();
        enc.commit();

        let mut data = base.data.clone();
        for y in 0..h {
            for x in 0..h {
                if (x + y) % 2 == 0 {
                    let idx = ((y * w + x) * 3) as usize;
                    data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
                }
            }
        }
        let frame = CapturedFrame::new(data, w, h, PixelFormat::Bgr);

        match enc.encode(&frame).unwrap() {
            DeltaResult::Keyframe { .. } => {}
            other => panic!("expected degradation to keyframe, got {other:?}"),
        }
    }

    #[test]
    fn large_dirty_volume_degrades_to_keyframe() {
        let mut enc = DeltaEncoder::new(FakeEncoder);
        let w = 50;
        let h = 50;
        let base = solid_frame(w, h, [0, 0, 0]);
        enc.encode(&base).unwrap();
        enc.commit();

        // Dirty a single rectangle covering 95% of the frame: one
        // contour, but over the 90% raw-pixel-volume cap.
        let mut data = base.data.clone();
        let dirty_h = (h as f64 * 0.95) as u32;
        for y in 0..dirty_h {
            for x in 0..w {
                let idx = ((y * w + x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let frame = CapturedFrame::new(data, w, h, PixelFormat::Bgr);

        match enc.encode(&frame).unwrap() {
            DeltaResult::Keyframe { .. } => {}
            other => panic!("expected degradation to keyframe, got {other:?}"),
        }
    }
}
