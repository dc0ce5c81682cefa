use crate::camera::Frame;
use crate::detector::{Detection, DetectorError, FaceBox, FaceDetector};
use crate::emotion::ExpressionScore;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What one scripted poll tick yields.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Faces(Vec<Detection>),
    Empty,
    Fail,
}

/// Detector playing back a canned script, one step per detect call. Used by
/// demo mode and tests in place of a live inference service. An exhausted
/// script keeps yielding empty results unless constructed as cycling.
#[derive(Clone)]
pub struct ScriptedDetector {
    inner: Arc<Inner>,
}

struct Inner {
    steps: Mutex<VecDeque<ScriptStep>>,
    cycle: bool,
    fail_load: bool,
    latency: Option<Duration>,
}

impl ScriptedDetector {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self::build(steps, false, false, None)
    }

    /// Loops the script forever, for open-ended demo runs.
    pub fn cycling(steps: Vec<ScriptStep>) -> Self {
        Self::build(steps, true, false, None)
    }

    /// Fails `load_models`, exercising the model-load degradation path.
    pub fn failing_load() -> Self {
        Self::build(Vec::new(), false, true, None)
    }

    /// Adds a fixed delay to every detect call, for tick-overlap tests.
    pub fn with_latency(self, latency: Duration) -> Self {
        let steps = {
            let guard = match self.inner.steps.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.iter().cloned().collect()
        };
        Self::build(steps, self.inner.cycle, self.inner.fail_load, Some(latency))
    }

    fn build(
        steps: Vec<ScriptStep>,
        cycle: bool,
        fail_load: bool,
        latency: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                steps: Mutex::new(steps.into()),
                cycle,
                fail_load,
                latency,
            }),
        }
    }

    fn next_step(&self) -> ScriptStep {
        let mut steps = match self.inner.steps.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        match steps.pop_front() {
            Some(step) => {
                if self.inner.cycle {
                    steps.push_back(step.clone());
                }
                step
            }
            None => ScriptStep::Empty,
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn load_models(&self) -> BoxFuture<'_, Result<(), DetectorError>> {
        let fail = self.inner.fail_load;
        async move {
            if fail {
                return Err(DetectorError::ModelLoad {
                    details: "scripted load failure".to_owned(),
                });
            }
            Ok(())
        }
        .boxed()
    }

    fn detect(&self, _frame: Frame) -> BoxFuture<'_, Result<Vec<Detection>, DetectorError>> {
        let this = self.clone();
        async move {
            if let Some(latency) = this.inner.latency {
                tokio::time::sleep(latency).await;
            }
            match this.next_step() {
                ScriptStep::Faces(detections) => Ok(detections),
                ScriptStep::Empty => Ok(Vec::new()),
                ScriptStep::Fail => Err(DetectorError::Inference {
                    details: "scripted inference failure".to_owned(),
                }),
            }
        }
        .boxed()
    }
}

/// Builds a centered single-face detection from labelled scores, in script
/// order.
pub fn detection_with_expressions(expressions: &[(&str, f32)]) -> Detection {
    Detection {
        face: FaceBox {
            x: 192.0,
            y: 112.0,
            width: 256.0,
            height: 256.0,
        },
        landmarks: Vec::new(),
        expressions: expressions
            .iter()
            .map(|(label, score)| ExpressionScore::new(*label, *score))
            .collect(),
    }
}
