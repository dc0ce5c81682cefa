use crate::detector::{Detection, FaceBox};
use std::sync::Mutex;

/// Detection geometry scaled to the live display, rebuilt from scratch every
/// tick. Drawing the new frame replaces the previous one entirely.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayFrame {
    pub width: u32,
    pub height: u32,
    pub boxes: Vec<FaceBox>,
    pub landmarks: Vec<(f32, f32)>,
}

impl OverlayFrame {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            boxes: Vec::new(),
            landmarks: Vec::new(),
        }
    }
}

/// Maps detection geometry from source-frame coordinates onto the display
/// dimensions. Pure; holds no state between ticks.
pub fn scale_to_display(
    detections: &[Detection],
    source: (u32, u32),
    display: (u32, u32),
) -> OverlayFrame {
    let (src_w, src_h) = source;
    let (dst_w, dst_h) = display;
    if src_w == 0 || src_h == 0 {
        return OverlayFrame::empty(dst_w, dst_h);
    }

    let sx = dst_w as f32 / src_w as f32;
    let sy = dst_h as f32 / src_h as f32;

    let mut frame = OverlayFrame::empty(dst_w, dst_h);
    for det in detections {
        frame.boxes.push(FaceBox {
            x: det.face.x * sx,
            y: det.face.y * sy,
            width: det.face.width * sx,
            height: det.face.height * sy,
        });
        frame
            .landmarks
            .extend(det.landmarks.iter().map(|(x, y)| (x * sx, y * sy)));
    }
    frame
}

/// Consumes overlay frames. Infallible by contract: a sink with nowhere to
/// draw silently drops the frame.
pub trait OverlaySink: Send + Sync {
    fn draw(&self, frame: OverlayFrame);
}

/// Logs box geometry at debug level; the headless stand-in for a canvas.
#[derive(Clone, Debug, Default)]
pub struct TracingOverlaySink;

impl OverlaySink for TracingOverlaySink {
    fn draw(&self, frame: OverlayFrame) {
        for b in &frame.boxes {
            tracing::debug!(
                x = b.x,
                y = b.y,
                width = b.width,
                height = b.height,
                "face box"
            );
        }
    }
}

/// Captures every drawn frame, for tests.
#[derive(Debug, Default)]
pub struct RecordingOverlaySink {
    frames: Mutex<Vec<OverlayFrame>>,
}

impl RecordingOverlaySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<OverlayFrame> {
        match self.frames.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OverlaySink for RecordingOverlaySink {
    fn draw(&self, frame: OverlayFrame) {
        match self.frames.lock() {
            Ok(mut g) => g.push(frame),
            Err(poisoned) => poisoned.into_inner().push(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::ExpressionScore;

    fn detection_at(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            face: FaceBox {
                x,
                y,
                width: w,
                height: h,
            },
            landmarks: vec![(x + 10.0, y + 10.0)],
            expressions: vec![ExpressionScore::new("neutral", 1.0)],
        }
    }

    #[test]
    fn boxes_scale_to_display_dimensions() {
        let frame = scale_to_display(
            &[detection_at(100.0, 50.0, 200.0, 100.0)],
            (640, 480),
            (1280, 960),
        );
        assert_eq!(frame.boxes.len(), 1);
        let b = frame.boxes[0];
        assert_eq!((b.x, b.y), (200.0, 100.0));
        assert_eq!((b.width, b.height), (400.0, 200.0));
        assert_eq!(frame.landmarks[0], (220.0, 120.0));
    }

    #[test]
    fn zero_source_dimensions_yield_empty_frame() {
        let frame = scale_to_display(&[detection_at(0.0, 0.0, 10.0, 10.0)], (0, 480), (640, 480));
        assert!(frame.boxes.is_empty());
    }

    #[test]
    fn recording_sink_keeps_every_frame() {
        let sink = RecordingOverlaySink::new();
        sink.draw(OverlayFrame::empty(640, 480));
        sink.draw(scale_to_display(
            &[detection_at(0.0, 0.0, 64.0, 64.0)],
            (640, 480),
            (640, 480),
        ));
        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].boxes.is_empty());
        assert_eq!(frames[1].boxes.len(), 1);
    }
}
