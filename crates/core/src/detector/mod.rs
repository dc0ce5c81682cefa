mod remote;
mod scripted;

use crate::camera::Frame;
use crate::emotion::ExpressionScore;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use remote::RemoteDetector;
pub use scripted::{detection_with_expressions, ScriptStep, ScriptedDetector};

/// Bounding box of one detected face, in source-frame coordinates.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One face-region result from the external model, with per-emotion scores.
/// Scores are softmax-like but not guaranteed normalized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    #[serde(rename = "box")]
    pub face: FaceBox,
    #[serde(default)]
    pub landmarks: Vec<(f32, f32)>,
    pub expressions: Vec<ExpressionScore>,
}

#[derive(thiserror::Error, Debug)]
pub enum DetectorError {
    #[error("model load failed: {details}")]
    ModelLoad { details: String },

    #[error("invalid detector url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference request failed: HTTP {status}")]
    InferenceStatus { status: u16 },

    #[error("invalid detector response: {details}")]
    InvalidResponse { details: String },

    #[error("inference failed: {details}")]
    Inference { details: String },
}

/// Boundary to the external face/expression model. Loading is asynchronous,
/// fallible, and happens once per session; the core never retries it.
pub trait FaceDetector: Send + Sync {
    fn load_models(&self) -> BoxFuture<'_, Result<(), DetectorError>>;

    /// Zero or more detections for the given frame. The polling loop treats
    /// any error as "no detection this tick".
    fn detect(&self, frame: Frame) -> BoxFuture<'_, Result<Vec<Detection>, DetectorError>>;
}
