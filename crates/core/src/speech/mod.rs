mod announcer;
mod hum;

use crate::audio::AudioError;
use crate::emotion::Emotion;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub use announcer::Announcer;
pub use hum::HumVoice;

/// Fixed affirmation per emotion. Closed lookup table; unmapped labels never
/// reach the announcer because they collapse to neutral at label parsing.
pub fn announcement(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Happy => "Parece que hoy estás de buen humor. Me alegra verte así.",
        Emotion::Sad => "Todo estará bien. A veces un día gris también enseña cosas valiosas.",
        Emotion::Angry => "Veo que estás enojado. Respira profundo, todo pasará.",
        Emotion::Fearful => "Detecté miedo. No te preocupes, estoy aquí para ayudarte.",
        Emotion::Disgusted => "Parece que algo no te agrada. Es normal tener preferencias.",
        Emotion::Surprised => "¡Vaya! Te sorprendiste. Eso es interesante.",
        Emotion::Neutral => "Te veo tranquilo. Un estado perfecto para aprender.",
    }
}

/// Emotion-dependent delivery adjustments applied on top of the base voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeechStyle {
    pub pitch: f32,
    pub rate: f32,
}

pub fn style_for(emotion: Emotion) -> SpeechStyle {
    match emotion {
        Emotion::Happy => SpeechStyle {
            pitch: 1.2,
            rate: 1.1,
        },
        Emotion::Sad => SpeechStyle {
            pitch: 0.8,
            rate: 0.85,
        },
        Emotion::Angry => SpeechStyle {
            pitch: 1.1,
            rate: 1.2,
        },
        Emotion::Surprised => SpeechStyle {
            pitch: 1.3,
            rate: 1.15,
        },
        Emotion::Fearful => SpeechStyle {
            pitch: 0.9,
            rate: 0.9,
        },
        Emotion::Disgusted | Emotion::Neutral => SpeechStyle {
            pitch: 1.0,
            rate: 0.95,
        },
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum SpeechError {
    #[error("speech synthesis failed: {details}")]
    Synthesis { details: String },

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Text-to-speech boundary. Best-effort: callers log failures and move on.
pub trait SpeechVoice: Send + Sync {
    fn speak(&self, request: SpeechRequest) -> BoxFuture<'_, Result<(), SpeechError>>;

    /// Cancel any in-flight utterance. Always succeeds.
    fn cancel_all(&self);
}

/// Voice that records requests instead of speaking, for tests.
#[derive(Debug, Default)]
pub struct RecordingVoice {
    utterances: Mutex<Vec<SpeechRequest>>,
    cancels: AtomicUsize,
}

impl RecordingVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utterances(&self) -> Vec<SpeechRequest> {
        match self.utterances.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::Relaxed)
    }
}

impl SpeechVoice for RecordingVoice {
    fn speak(&self, request: SpeechRequest) -> BoxFuture<'_, Result<(), SpeechError>> {
        async move {
            match self.utterances.lock() {
                Ok(mut g) => g.push(request),
                Err(poisoned) => poisoned.into_inner().push(request),
            }
            Ok(())
        }
        .boxed()
    }

    fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::Relaxed);
    }
}
