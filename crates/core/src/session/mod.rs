use crate::audio::AudioSink;
use crate::camera::{CameraError, CameraSource};
use crate::config::AppConfig;
use crate::detector::{DetectorError, FaceDetector};
use crate::effects::{play_scan_sweep, ParticleField, ParticleSink, ToneCue};
use crate::emotion::EmotionStateCell;
use crate::overlay::OverlaySink;
use crate::poller::EmotionPoller;
use crate::speech::{Announcer, SpeechVoice};
use std::sync::Arc;
use std::time::Duration;

const PARTICLE_STEP_MS: u64 = 16;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("model load failed: {0}")]
    ModelLoad(#[source] DetectorError),

    #[error("camera unavailable: {0}")]
    Camera(#[from] CameraError),
}

/// Wires the polling loop to its reactive effects. The poller is the sole
/// writer of the emotion state; every effect task is a pure reader on its
/// own subscription.
pub struct Session<C> {
    pub camera: C,
    pub detector: Arc<dyn FaceDetector>,
    pub overlay: Arc<dyn OverlaySink>,
    pub audio: Arc<dyn AudioSink>,
    pub voice: Arc<dyn SpeechVoice>,
    pub particles: Arc<dyn ParticleSink>,
    pub config: AppConfig,
}

impl<C> Session<C>
where
    C: CameraSource,
{
    /// Run the full feature: load models once, start the camera and polling
    /// loop, fan out to effects, and tear everything down when `run_for`
    /// elapses (or on ctrl-c when unbounded).
    ///
    /// Model-load and camera failures are fatal to the feature and surface
    /// here; everything that happens later is absorbed per tick.
    pub async fn run(&self, run_for: Option<Duration>) -> Result<(), SessionError> {
        self.detector
            .load_models()
            .await
            .map_err(SessionError::ModelLoad)?;
        tracing::info!("detector models ready");

        let state = EmotionStateCell::new();
        let mut poller = EmotionPoller::new(state.clone(), self.config.tick);
        poller
            .start(
                &self.camera,
                Arc::clone(&self.detector),
                Arc::clone(&self.overlay),
            )
            .await?;

        let announcer_task = {
            let mut rx = state.subscribe();
            let mut announcer = Announcer::new(
                Arc::clone(&self.voice),
                self.config.speech_lang.clone(),
                self.config.speech_volume,
            );
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let current = *rx.borrow_and_update();
                    announcer.on_state(&current).await;
                }
            })
        };

        let tone_task = {
            let mut rx = state.subscribe();
            let mut cue = ToneCue::new(Arc::clone(&self.audio));
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let current = *rx.borrow_and_update();
                    cue.on_state(&current).await;
                }
            })
        };

        // The scanner chirp repeats on its own clock while the session is
        // active, regardless of emotion. The first tick fires immediately.
        let scan_task = {
            let audio = Arc::clone(&self.audio);
            let period = self.config.scan_period.duration();
            tokio::spawn(async move {
                let mut timer = tokio::time::interval(period);
                loop {
                    timer.tick().await;
                    play_scan_sweep(audio.as_ref()).await;
                }
            })
        };

        // Continuous ambient loop, restyled from whatever the state holds.
        let particle_task = {
            let cell = state.clone();
            let sink = Arc::clone(&self.particles);
            let width = self.config.camera.width as f32;
            let height = self.config.camera.height as f32;
            tokio::spawn(async move {
                let mut field = ParticleField::new(width, height);
                let mut timer = tokio::time::interval(Duration::from_millis(PARTICLE_STEP_MS));
                loop {
                    timer.tick().await;
                    field.step(cell.get().dominant);
                    sink.render(&field.render());
                }
            })
        };

        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "ctrl-c handler failed; shutting down");
                }
            }
        }

        poller.stop();
        for task in [announcer_task, tone_task, scan_task, particle_task] {
            task.abort();
        }
        // No utterance or cue may outlive the session.
        self.voice.cancel_all();
        self.audio.stop_all();
        tracing::info!("session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudioSink;
    use crate::camera::SyntheticCamera;
    use crate::config::{ScanPeriod, TickInterval};
    use crate::detector::{detection_with_expressions, ScriptStep, ScriptedDetector};
    use crate::effects::RecordingParticleSink;
    use crate::emotion::Emotion;
    use crate::overlay::RecordingOverlaySink;
    use crate::speech::{announcement, RecordingVoice};

    fn test_config() -> AppConfig {
        AppConfig {
            tick: TickInterval::new(10).expect("nonzero"),
            scan_period: ScanPeriod::new(50).expect("nonzero"),
            ..AppConfig::default()
        }
    }

    struct Harness {
        session: Session<SyntheticCamera>,
        audio: Arc<NullAudioSink>,
        voice: Arc<RecordingVoice>,
        overlay: Arc<RecordingOverlaySink>,
        particles: Arc<RecordingParticleSink>,
    }

    fn harness(camera: SyntheticCamera, detector: ScriptedDetector) -> Harness {
        let audio = Arc::new(NullAudioSink::new());
        let voice = Arc::new(RecordingVoice::new());
        let overlay = Arc::new(RecordingOverlaySink::new());
        let particles = Arc::new(RecordingParticleSink::new());
        let session = Session {
            camera,
            detector: Arc::new(detector),
            overlay: overlay.clone(),
            audio: audio.clone(),
            voice: voice.clone(),
            particles: particles.clone(),
            config: test_config(),
        };
        Harness {
            session,
            audio,
            voice,
            overlay,
            particles,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bounded_run_drives_all_effects_once() {
        let detector = ScriptedDetector::cycling(vec![
            ScriptStep::Faces(vec![detection_with_expressions(&[("happy", 0.9)])]),
            ScriptStep::Empty,
        ]);
        let h = harness(SyntheticCamera::new(Default::default()), detector);

        h.session
            .run(Some(Duration::from_millis(250)))
            .await
            .expect("run");

        // Happy alternating with no-face: the edge fires once overall.
        let spoken = h.voice.utterances();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, announcement(Emotion::Happy));

        // Scan sweeps plus one happy cue.
        assert!(h.audio.clips().len() >= 2);

        assert!(!h.overlay.frames().is_empty());
        assert!(!h.particles.frames().is_empty());

        // Teardown cancelled speech and audio.
        assert!(h.voice.cancel_count() >= 1);
        assert!(h.audio.stop_count() >= 1);
    }

    #[tokio::test]
    async fn model_load_failure_degrades_the_feature() {
        let h = harness(
            SyntheticCamera::new(Default::default()),
            ScriptedDetector::failing_load(),
        );

        let err = h
            .session
            .run(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::ModelLoad(_)));

        // The camera never started, so nothing downstream ran.
        assert!(h.voice.utterances().is_empty());
        assert!(h.overlay.frames().is_empty());
    }

    #[tokio::test]
    async fn camera_denial_surfaces_without_touching_model_state() {
        let h = harness(
            SyntheticCamera::denied(Default::default()),
            ScriptedDetector::new(Vec::new()),
        );

        let err = h
            .session
            .run(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Camera(CameraError::PermissionDenied)));
        assert!(h.voice.utterances().is_empty());
    }
}
