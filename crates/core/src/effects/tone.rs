use crate::audio::{AudioSink, PcmClip};
use crate::emotion::{Emotion, EmotionEdge, EmotionState};
use std::f32::consts::PI;
use std::sync::Arc;

pub const CUE_SAMPLE_RATE_HZ: u32 = 22_050;

// Gain envelope shared by every note: fixed attack, exponential decay to
// near-silence over the note's length.
const NOTE_ATTACK_GAIN: f32 = 0.3;
const NOTE_FLOOR_GAIN: f32 = 0.01;

// Scan sweep: a short downward laser chirp played on a fixed interval while
// scanning is active, independent of emotion.
const SWEEP_START_HZ: f32 = 800.0;
const SWEEP_END_HZ: f32 = 200.0;
const SWEEP_GAIN: f32 = 0.1;
const SWEEP_MS: u64 = 100;

/// One scheduled sine note: pitch, start offset within the cue, length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub freq_hz: f32,
    pub start_ms: u64,
    pub duration_ms: u64,
}

const fn note(freq_hz: f32, start_ms: u64, duration_ms: u64) -> Note {
    Note {
        freq_hz,
        start_ms,
        duration_ms,
    }
}

// Cheerful ascending triad: C5 E5 G5.
const HAPPY_CUE: [Note; 3] = [
    note(523.25, 0, 100),
    note(659.25, 100, 100),
    note(783.99, 200, 200),
];

// Descending melancholic line: G4 F4 D4.
const SAD_CUE: [Note; 3] = [
    note(392.0, 0, 150),
    note(349.23, 150, 150),
    note(293.66, 300, 300),
];

// Harsh semitone rattle: A4 A#4 A4.
const ANGRY_CUE: [Note; 3] = [
    note(440.0, 0, 80),
    note(466.16, 80, 80),
    note(440.0, 160, 80),
];

// Trembling repeated D5.
const FEARFUL_CUE: [Note; 3] = [
    note(587.33, 0, 50),
    note(587.33, 80, 50),
    note(587.33, 160, 100),
];

// Low guttural pair: A3 B3.
const DISGUSTED_CUE: [Note; 2] = [note(220.0, 0, 200), note(246.94, 200, 200)];

// Quick bright run: E5 G5 B5.
const SURPRISED_CUE: [Note; 3] = [
    note(659.25, 0, 50),
    note(783.99, 50, 50),
    note(987.77, 100, 150),
];

// Single steady A4.
const NEUTRAL_CUE: [Note; 1] = [note(440.0, 0, 300)];

/// Per-emotion cue tables. The exact pitches are presentation tuning; the
/// contract is only that each emotion sounds distinguishable.
pub fn emotion_cue(emotion: Emotion) -> &'static [Note] {
    match emotion {
        Emotion::Happy => &HAPPY_CUE,
        Emotion::Sad => &SAD_CUE,
        Emotion::Angry => &ANGRY_CUE,
        Emotion::Fearful => &FEARFUL_CUE,
        Emotion::Disgusted => &DISGUSTED_CUE,
        Emotion::Surprised => &SURPRISED_CUE,
        Emotion::Neutral => &NEUTRAL_CUE,
    }
}

fn note_gain(t_frac: f32) -> f32 {
    NOTE_ATTACK_GAIN * (NOTE_FLOOR_GAIN / NOTE_ATTACK_GAIN).powf(t_frac)
}

fn sweep_freq(t_frac: f32) -> f32 {
    SWEEP_START_HZ * (SWEEP_END_HZ / SWEEP_START_HZ).powf(t_frac)
}

/// Mixes a note sequence into one mono clip, honoring each note's start
/// offset.
pub fn render_cue(notes: &[Note]) -> PcmClip {
    let total_ms = notes
        .iter()
        .map(|n| n.start_ms + n.duration_ms)
        .max()
        .unwrap_or(0);
    let sr = CUE_SAMPLE_RATE_HZ as f32;
    let total_samples = (total_ms * u64::from(CUE_SAMPLE_RATE_HZ) / 1000) as usize;
    let mut mix = vec![0.0f32; total_samples];

    for n in notes {
        let start = (n.start_ms * u64::from(CUE_SAMPLE_RATE_HZ) / 1000) as usize;
        let len = (n.duration_ms * u64::from(CUE_SAMPLE_RATE_HZ) / 1000) as usize;
        for i in 0..len {
            let Some(slot) = mix.get_mut(start + i) else {
                break;
            };
            let t = i as f32 / sr;
            let t_frac = i as f32 / len.max(1) as f32;
            *slot += (2.0 * PI * n.freq_hz * t).sin() * note_gain(t_frac);
        }
    }

    PcmClip {
        sample_rate_hz: CUE_SAMPLE_RATE_HZ,
        channels: 1,
        pcm_i16: mix
            .into_iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect(),
    }
}

/// The 800 Hz -> 200 Hz scanner chirp. Phase-continuous so the sweep stays
/// click-free.
pub fn render_scan_sweep() -> PcmClip {
    let sr = CUE_SAMPLE_RATE_HZ as f32;
    let len = (SWEEP_MS * u64::from(CUE_SAMPLE_RATE_HZ) / 1000) as usize;
    let mut pcm = Vec::with_capacity(len);
    let mut phase = 0.0f32;

    for i in 0..len {
        let t_frac = i as f32 / len as f32;
        phase += 2.0 * PI * sweep_freq(t_frac) / sr;
        let gain = SWEEP_GAIN * (NOTE_FLOOR_GAIN / SWEEP_GAIN).powf(t_frac);
        pcm.push((phase.sin() * gain * i16::MAX as f32) as i16);
    }

    PcmClip {
        sample_rate_hz: CUE_SAMPLE_RATE_HZ,
        channels: 1,
        pcm_i16: pcm,
    }
}

/// Edge-triggered tone cue: plays one short per-emotion cue whenever the
/// dominant label changes, never on repeat ticks of the same label.
pub struct ToneCue {
    audio: Arc<dyn AudioSink>,
    edge: EmotionEdge,
}

impl ToneCue {
    pub fn new(audio: Arc<dyn AudioSink>) -> Self {
        Self {
            audio,
            edge: EmotionEdge::new(),
        }
    }

    pub async fn on_state(&mut self, state: &EmotionState) {
        let Some(emotion) = self.edge.observe(state) else {
            return;
        };
        let clip = render_cue(emotion_cue(emotion));
        if let Err(e) = self.audio.play(clip).await {
            tracing::warn!(error = %e, emotion = emotion.label(), "tone cue playback failed");
        }
    }
}

/// Fired by the session on its fixed scan interval while the camera is
/// active; not tied to emotion changes.
pub async fn play_scan_sweep(audio: &dyn AudioSink) {
    if let Err(e) = audio.play(render_scan_sweep()).await {
        tracing::warn!(error = %e, "scan sweep playback failed");
    }
}
