mod output;

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub use output::RodioAudioSink;

/// A rendered mono/stereo PCM clip ready for playback.
#[derive(Clone, Debug, PartialEq)]
pub struct PcmClip {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub pcm_i16: Vec<i16>,
}

impl PcmClip {
    /// Empty or malformed PCM is skipped by sinks rather than played.
    pub fn is_blank(&self) -> bool {
        self.sample_rate_hz == 0
            || self.channels == 0
            || self.pcm_i16.is_empty()
            || self.pcm_i16.len() % usize::from(self.channels) != 0
    }

    pub fn duration(&self) -> Duration {
        if self.is_blank() {
            return Duration::ZERO;
        }
        let frames = self.pcm_i16.len() as u64 / u64::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate_hz))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("audio output unavailable: {details}")]
    OutputUnavailable { details: String },
}

/// Output boundary for synthesized cues and speech. Effects treat playback
/// as best-effort: failures are logged by callers, never propagated to the
/// polling loop.
pub trait AudioSink: Send + Sync {
    fn play(&self, clip: PcmClip) -> BoxFuture<'_, Result<(), AudioError>>;

    /// Cut off whatever is currently sounding. Always succeeds.
    fn stop_all(&self);
}

/// At most this many clips are retained; older ones are dropped first. Keeps
/// a muted long-running session from accumulating PCM forever.
pub const RECORDED_CLIP_CAP: usize = 64;

/// Sink that discards audio while recording what would have played. Used by
/// tests and by `--mute`. Retains only the most recent
/// [`RECORDED_CLIP_CAP`] clips.
#[derive(Debug, Default)]
pub struct NullAudioSink {
    clips: Mutex<Vec<PcmClip>>,
    stops: AtomicUsize,
}

impl NullAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clips(&self) -> Vec<PcmClip> {
        match self.clips.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::Relaxed)
    }
}

impl AudioSink for NullAudioSink {
    fn play(&self, clip: PcmClip) -> BoxFuture<'_, Result<(), AudioError>> {
        async move {
            if clip.is_blank() {
                return Ok(());
            }
            let mut recorded = match self.clips.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            if recorded.len() == RECORDED_CLIP_CAP {
                recorded.remove(0);
            }
            recorded.push(clip);
            Ok(())
        }
        .boxed()
    }

    fn stop_all(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }
}
