mod synthetic;

use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use synthetic::SyntheticCamera;

/// One video frame pulled from the live feed. The pixel payload is opaque to
/// the core; only the detector backend interprets it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera device available")]
    NoDevice,
}

/// Supplies frames for an open camera session.
pub trait FrameGrabber: Send + Sync {
    fn grab(&self) -> Frame;
}

/// An open media stream. Clones share the same underlying tracks, so
/// releasing any clone stops them all.
#[derive(Clone)]
pub struct CameraSession {
    width: u32,
    height: u32,
    grabber: Arc<dyn FrameGrabber>,
    active: Arc<AtomicBool>,
}

impl CameraSession {
    pub fn new(width: u32, height: u32, grabber: Arc<dyn FrameGrabber>) -> Self {
        Self {
            width,
            height,
            grabber,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Current frame, or `None` once the session has been released.
    pub fn grab_frame(&self) -> Option<Frame> {
        if !self.is_active() {
            return None;
        }
        Some(self.grabber.grab())
    }

    /// Stop all media tracks. Idempotent; always succeeds.
    pub fn release(&self) {
        if self.active.swap(false, Ordering::Relaxed) {
            tracing::debug!("camera session released");
        }
    }
}

pub trait CameraSource: Send + Sync {
    /// Acquire permission and open the stream. Fallible, single-shot, no
    /// retry in the core.
    fn acquire(&self) -> BoxFuture<'_, Result<CameraSession, CameraError>>;
}
