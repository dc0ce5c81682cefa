use crate::camera::{CameraError, CameraSession, CameraSource, Frame, FrameGrabber};
use crate::config::CameraConfig;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Camera source producing a generated test pattern, used by demo mode and
/// tests. Can be constructed to fail acquisition the way a real device does.
#[derive(Clone)]
pub struct SyntheticCamera {
    config: CameraConfig,
    failure: Option<CameraError>,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            failure: None,
        }
    }

    /// Simulates a user denying the permission prompt.
    pub fn denied(config: CameraConfig) -> Self {
        Self {
            config,
            failure: Some(CameraError::PermissionDenied),
        }
    }

    /// Simulates a machine with no capture device.
    pub fn absent(config: CameraConfig) -> Self {
        Self {
            config,
            failure: Some(CameraError::NoDevice),
        }
    }
}

impl CameraSource for SyntheticCamera {
    fn acquire(&self) -> BoxFuture<'_, Result<CameraSession, CameraError>> {
        let this = self.clone();
        async move {
            if let Some(err) = this.failure {
                return Err(err);
            }
            let grabber = Arc::new(PatternGrabber {
                width: this.config.width,
                height: this.config.height,
                counter: AtomicU64::new(0),
            });
            Ok(CameraSession::new(
                this.config.width,
                this.config.height,
                grabber,
            ))
        }
        .boxed()
    }
}

/// Greyscale diagonal gradient that drifts one pixel per grab, so
/// consecutive frames are distinct.
struct PatternGrabber {
    width: u32,
    height: u32,
    counter: AtomicU64,
}

impl FrameGrabber for PatternGrabber {
    fn grab(&self) -> Frame {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut pixels = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.push(((u64::from(x) + u64::from(y) + n) % 256) as u8);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            pixels: Bytes::from(pixels),
        }
    }
}
