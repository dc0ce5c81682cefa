use crate::audio::{AudioError, AudioSink, PcmClip};
use futures::future::BoxFuture;
use futures::FutureExt;
use rodio::source::Source;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::sync::{Arc, Mutex};

/// Poison-tolerant lazy holder for the one [`rodio::OutputStream`].
///
/// The stream must stay alive across plays: opening a fresh stream per clip
/// makes Rodio drop the previous one mid-playback and truncates audio.
struct LazyStream {
    value: Mutex<Option<OutputStream>>,
}

impl LazyStream {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    fn with_stream<R>(
        &self,
        open: impl FnOnce() -> Result<OutputStream, AudioError>,
        f: impl FnOnce(&OutputStream) -> R,
    ) -> Result<R, AudioError> {
        let mut guard = match self.value.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("output stream cache lock was poisoned; recovering");
                poisoned.into_inner()
            }
        };

        if guard.is_none() {
            *guard = Some(open()?);
        }

        match guard.as_ref() {
            Some(stream) => Ok(f(stream)),
            None => Err(AudioError::OutputUnavailable {
                details: "internal error: output stream cache invariant violated".to_owned(),
            }),
        }
    }
}

/// Rodio-backed audio output. Clones share one output stream; the currently
/// sounding sink is tracked so `stop_all` can cut it off (speech
/// cancellation).
#[derive(Clone)]
pub struct RodioAudioSink {
    stream: Arc<LazyStream>,
    current: Arc<Mutex<Option<Arc<Sink>>>>,
}

impl RodioAudioSink {
    pub fn new() -> Self {
        Self {
            stream: Arc::new(LazyStream::new()),
            current: Arc::new(Mutex::new(None)),
        }
    }

    fn connect_sink(&self) -> Result<Sink, AudioError> {
        self.stream.with_stream(
            || {
                OutputStreamBuilder::open_default_stream().map_err(|e| {
                    AudioError::OutputUnavailable {
                        details: format!("open default output stream: {e}"),
                    }
                })
            },
            |stream| {
                let mixer = stream.mixer();
                Sink::connect_new(&mixer)
            },
        )
    }

    fn set_current(&self, sink: Option<Arc<Sink>>) {
        let mut guard = match self.current.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = sink;
    }
}

impl Default for RodioAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for RodioAudioSink {
    fn play(&self, clip: PcmClip) -> BoxFuture<'_, Result<(), AudioError>> {
        async move {
            if clip.is_blank() {
                tracing::debug!(
                    sample_rate_hz = clip.sample_rate_hz,
                    channels = clip.channels,
                    samples_i16 = clip.pcm_i16.len(),
                    "skipping playback of empty/invalid PCM"
                );
                return Ok(());
            }

            let sink = Arc::new(self.connect_sink()?);
            self.set_current(Some(Arc::clone(&sink)));

            let source = PcmSource::new(clip.pcm_i16, clip.sample_rate_hz, clip.channels);
            sink.append(source);
            sink.sleep_until_end();

            self.set_current(None);
            Ok(())
        }
        .boxed()
    }

    fn stop_all(&self) {
        let guard = match self.current.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(sink) = guard.as_ref() {
            sink.stop();
        }
    }
}

struct PcmSource {
    samples: std::vec::IntoIter<i16>,
    sample_rate: u32,
    channels: u16,
}

impl PcmSource {
    fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into_iter(),
            sample_rate,
            channels,
        }
    }
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next().map(|s| s as f32 / i16::MAX as f32)
    }
}

impl Source for PcmSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}
