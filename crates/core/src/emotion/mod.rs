mod state;

use serde::{Deserialize, Serialize};

pub use state::{EmotionEdge, EmotionStateCell};

/// Closed set of emotion labels produced by the expression model.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
        Emotion::Neutral,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn from_label(label: &str) -> Option<Emotion> {
        Emotion::ALL.iter().copied().find(|e| e.label() == label)
    }

    /// Fallback policy for effect consumers: any label outside the closed set
    /// is treated as neutral.
    pub fn from_label_lossy(label: &str) -> Emotion {
        Emotion::from_label(label).unwrap_or(Emotion::Neutral)
    }
}

/// One entry of a detection's expression mapping. The sequence order is the
/// model's iteration order and doubles as the argmax tie-break order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExpressionScore {
    pub label: String,
    pub score: f32,
}

impl ExpressionScore {
    pub fn new<S: Into<String>>(label: S, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Current dominant emotion and confidence. Owned exclusively by the polling
/// loop; read-only to all reactive effects. Fully overwritten every tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmotionState {
    pub dominant: Option<Emotion>,
    pub confidence: u8,
}

impl EmotionState {
    pub const NONE: EmotionState = EmotionState {
        dominant: None,
        confidence: 0,
    };

    /// Reduce an expression mapping to the dominant emotion. Ties break to
    /// the first-encountered entry; unknown labels collapse to neutral.
    pub fn from_expressions(expressions: &[ExpressionScore]) -> EmotionState {
        let mut best: Option<&ExpressionScore> = None;
        for entry in expressions {
            match best {
                Some(b) if entry.score <= b.score => {}
                _ => best = Some(entry),
            }
        }

        match best {
            Some(entry) => EmotionState {
                dominant: Some(Emotion::from_label_lossy(&entry.label)),
                confidence: confidence_pct(entry.score),
            },
            None => EmotionState::NONE,
        }
    }
}

impl Default for EmotionState {
    fn default() -> Self {
        EmotionState::NONE
    }
}

fn confidence_pct(score: f32) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}
