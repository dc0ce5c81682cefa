use crate::audio::{AudioSink, PcmClip};
use crate::speech::{SpeechError, SpeechRequest, SpeechVoice};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::f32::consts::PI;
use std::sync::Arc;

const SAMPLE_RATE_HZ: u32 = 22_050;
const BASE_PITCH_HZ: f32 = 180.0;
const MS_PER_CHAR: u64 = 60;
const MIN_UTTERANCE_MS: u64 = 500;

/// Local stand-in voice: renders an utterance as a pitched hum whose length
/// follows the text and whose pitch/rate follow the request. Keeps the demo
/// audible without a platform TTS engine.
#[derive(Clone)]
pub struct HumVoice {
    audio: Arc<dyn AudioSink>,
}

impl HumVoice {
    pub fn new(audio: Arc<dyn AudioSink>) -> Self {
        Self { audio }
    }

    fn render(request: &SpeechRequest) -> PcmClip {
        let spoken_ms = (request.text.chars().count() as u64 * MS_PER_CHAR).max(MIN_UTTERANCE_MS);
        // A faster rate shortens the utterance proportionally.
        let duration_ms = (spoken_ms as f32 / request.rate.max(0.1)) as u64;
        let freq = BASE_PITCH_HZ * request.pitch.max(0.1);
        let len = (duration_ms * u64::from(SAMPLE_RATE_HZ) / 1000) as usize;
        let sr = SAMPLE_RATE_HZ as f32;

        let mut pcm = Vec::with_capacity(len);
        for i in 0..len {
            let t = i as f32 / sr;
            // Slow amplitude wobble stands in for syllable rhythm.
            let wobble = 0.6 + 0.4 * (2.0 * PI * 4.0 * t).sin().abs();
            let fade = 1.0 - (i as f32 / len.max(1) as f32);
            let sample = (2.0 * PI * freq * t).sin() * request.volume * 0.25 * wobble * fade;
            pcm.push((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
        }

        PcmClip {
            sample_rate_hz: SAMPLE_RATE_HZ,
            channels: 1,
            pcm_i16: pcm,
        }
    }
}

impl SpeechVoice for HumVoice {
    fn speak(&self, request: SpeechRequest) -> BoxFuture<'_, Result<(), SpeechError>> {
        async move {
            let clip = Self::render(&request);
            self.audio.play(clip).await?;
            Ok(())
        }
        .boxed()
    }

    fn cancel_all(&self) {
        self.audio.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudioSink;

    fn request(text: &str, rate: f32, pitch: f32) -> SpeechRequest {
        SpeechRequest {
            text: text.to_owned(),
            lang: "es-MX".to_owned(),
            rate,
            pitch,
            volume: 0.8,
            voice: None,
        }
    }

    #[test]
    fn longer_text_renders_longer_audio() {
        let short = HumVoice::render(&request("Hola.", 1.0, 1.0));
        let long = HumVoice::render(&request(
            "Parece que hoy estás de buen humor. Me alegra verte así.",
            1.0,
            1.0,
        ));
        assert!(long.pcm_i16.len() > short.pcm_i16.len());
    }

    #[test]
    fn faster_rate_shortens_the_utterance() {
        let slow = HumVoice::render(&request("Respira profundo.", 0.85, 1.0));
        let fast = HumVoice::render(&request("Respira profundo.", 1.2, 1.0));
        assert!(fast.pcm_i16.len() < slow.pcm_i16.len());
    }

    #[tokio::test]
    async fn speaking_routes_through_the_audio_sink() {
        let audio = Arc::new(NullAudioSink::new());
        let voice = HumVoice::new(audio.clone());

        voice
            .speak(request("Te veo tranquilo.", 0.95, 1.0))
            .await
            .expect("speak");
        voice.cancel_all();

        assert_eq!(audio.clips().len(), 1);
        assert_eq!(audio.stop_count(), 1);
    }
}
