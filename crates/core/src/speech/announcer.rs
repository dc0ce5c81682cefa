use crate::config::{SpeechLang, Volume};
use crate::emotion::{EmotionEdge, EmotionState};
use crate::speech::{announcement, style_for, SpeechRequest, SpeechVoice};
use std::sync::Arc;

/// Speaks one fixed affirmation per emotion, strictly on label changes.
/// Any in-flight utterance is cancelled before the new one starts, and
/// `shutdown` cancels on teardown so nothing outlives the camera session.
pub struct Announcer {
    voice: Arc<dyn SpeechVoice>,
    edge: EmotionEdge,
    lang: SpeechLang,
    volume: Volume,
}

impl Announcer {
    pub fn new(voice: Arc<dyn SpeechVoice>, lang: SpeechLang, volume: Volume) -> Self {
        Self {
            voice,
            edge: EmotionEdge::new(),
            lang,
            volume,
        }
    }

    pub async fn on_state(&mut self, state: &EmotionState) {
        let Some(emotion) = self.edge.observe(state) else {
            return;
        };

        self.voice.cancel_all();

        let style = style_for(emotion);
        let request = SpeechRequest {
            text: announcement(emotion).to_owned(),
            lang: self.lang.as_str().to_owned(),
            rate: style.rate,
            pitch: style.pitch,
            volume: self.volume.value(),
            voice: None,
        };

        if let Err(e) = self.voice.speak(request).await {
            tracing::warn!(error = %e, emotion = emotion.label(), "speech failed");
        }
    }

    pub fn shutdown(&self) {
        self.voice.cancel_all();
    }
}
