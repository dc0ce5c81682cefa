use crate::camera::{CameraError, CameraSession, CameraSource};
use crate::config::TickInterval;
use crate::detector::FaceDetector;
use crate::emotion::{EmotionState, EmotionStateCell};
use crate::overlay::{scale_to_display, OverlayFrame, OverlaySink};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Detection polling loop: the sole writer of [`EmotionState`].
///
/// State machine Idle -> Active -> Idle. While active, a fixed-period timer
/// pulls one frame per tick, queries the detector, and fully overwrites the
/// shared state with the reduced result (or NONE on empty/failed ticks).
pub struct EmotionPoller {
    state: EmotionStateCell,
    tick: TickInterval,
    running: Option<Running>,
}

struct Running {
    task: JoinHandle<()>,
    session: CameraSession,
}

impl EmotionPoller {
    pub fn new(state: EmotionStateCell, tick: TickInterval) -> Self {
        Self {
            state,
            tick,
            running: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// Idle -> Active: acquire the camera and arm the timer. Starting while
    /// already active is a no-op.
    pub async fn start<C: CameraSource>(
        &mut self,
        camera: &C,
        detector: Arc<dyn FaceDetector>,
        overlay: Arc<dyn OverlaySink>,
    ) -> Result<(), CameraError> {
        if self.running.is_some() {
            return Ok(());
        }

        let session = camera.acquire().await?;
        tracing::info!(
            width = session.dimensions().0,
            height = session.dimensions().1,
            tick_ms = self.tick.period_ms,
            "camera session started"
        );

        let task = tokio::spawn(poll_loop(
            session.clone(),
            detector,
            overlay,
            self.state.clone(),
            self.tick,
        ));
        self.running = Some(Running { task, session });
        Ok(())
    }

    /// Active -> Idle: disarm the timer, release all media tracks, reset the
    /// shared state. Synchronous and idempotent. Aborting the poll task
    /// drops an in-flight detection call at its await point, and the loop
    /// re-checks the released session after each call before writing, so a
    /// late inference result is discarded instead of resurrecting state.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.task.abort();
        running.session.release();
        self.state.reset();
        tracing::info!("emotion poller stopped");
    }
}

impl Drop for EmotionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    session: CameraSession,
    detector: Arc<dyn FaceDetector>,
    overlay: Arc<dyn OverlaySink>,
    state: EmotionStateCell,
    tick: TickInterval,
) {
    let mut timer = tokio::time::interval(tick.duration());
    // Ticks are serialized: each awaits its detection call inside this one
    // task before the timer can fire again, and ticks missed while a slow
    // call is in flight are skipped rather than queued.
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let display = session.dimensions();

    loop {
        timer.tick().await;

        let Some(frame) = session.grab_frame() else {
            continue;
        };
        let source = (frame.width, frame.height);

        let result = detector.detect(frame).await;
        // The session may have been released while the call was in flight.
        if !session.is_active() {
            break;
        }

        match result {
            Ok(detections) if !detections.is_empty() => {
                // First face wins: the UI tracks a single subject.
                state.set(EmotionState::from_expressions(&detections[0].expressions));
                overlay.draw(scale_to_display(&detections, source, display));
            }
            Ok(_) => {
                state.set(EmotionState::NONE);
                overlay.draw(OverlayFrame::empty(display.0, display.1));
            }
            Err(e) => {
                // A failed tick counts as "no detection"; the loop goes on.
                tracing::debug!(error = %e, "detection failed this tick");
                state.set(EmotionState::NONE);
                overlay.draw(OverlayFrame::empty(display.0, display.1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SyntheticCamera;
    use crate::config::CameraConfig;
    use crate::detector::{detection_with_expressions, ScriptStep, ScriptedDetector};
    use crate::emotion::Emotion;
    use crate::overlay::RecordingOverlaySink;
    use std::time::Duration;

    fn fast_tick() -> TickInterval {
        TickInterval::new(10).expect("nonzero")
    }

    fn camera() -> SyntheticCamera {
        SyntheticCamera::new(CameraConfig::default())
    }

    #[tokio::test]
    async fn ticks_reduce_detections_into_state() {
        let state = EmotionStateCell::new();
        let mut rx = state.subscribe();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        let detector = ScriptedDetector::new(vec![
            ScriptStep::Faces(vec![detection_with_expressions(&[
                ("happy", 0.82),
                ("neutral", 0.10),
                ("sad", 0.08),
            ])]),
            ScriptStep::Empty,
        ]);

        poller
            .start(
                &camera(),
                Arc::new(detector),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await
            .expect("start");
        assert!(poller.is_active());

        rx.changed().await.expect("first tick");
        let first = *rx.borrow_and_update();
        assert_eq!(first.dominant, Some(Emotion::Happy));
        assert_eq!(first.confidence, 82);

        rx.changed().await.expect("second tick");
        assert_eq!(*rx.borrow_and_update(), EmotionState::NONE);

        poller.stop();
    }

    #[tokio::test]
    async fn first_face_wins_over_later_faces() {
        let state = EmotionStateCell::new();
        let mut rx = state.subscribe();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        let detector = ScriptedDetector::new(vec![ScriptStep::Faces(vec![
            detection_with_expressions(&[("sad", 0.55)]),
            detection_with_expressions(&[("happy", 0.99)]),
        ])]);

        poller
            .start(
                &camera(),
                Arc::new(detector),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await
            .expect("start");

        rx.changed().await.expect("tick");
        assert_eq!(rx.borrow_and_update().dominant, Some(Emotion::Sad));
        poller.stop();
    }

    #[tokio::test]
    async fn failed_ticks_read_as_no_detection() {
        let state = EmotionStateCell::new();
        let mut rx = state.subscribe();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        let detector = ScriptedDetector::new(vec![
            ScriptStep::Faces(vec![detection_with_expressions(&[("angry", 0.7)])]),
            ScriptStep::Fail,
        ]);

        poller
            .start(
                &camera(),
                Arc::new(detector),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await
            .expect("start");

        rx.changed().await.expect("face tick");
        assert_eq!(rx.borrow_and_update().dominant, Some(Emotion::Angry));

        rx.changed().await.expect("failed tick");
        assert_eq!(*rx.borrow_and_update(), EmotionState::NONE);
        poller.stop();
    }

    #[tokio::test]
    async fn overlay_gets_scaled_geometry_each_face_tick() {
        let state = EmotionStateCell::new();
        let mut rx = state.subscribe();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());
        let overlay = Arc::new(RecordingOverlaySink::new());

        let detector = ScriptedDetector::new(vec![ScriptStep::Faces(vec![
            detection_with_expressions(&[("happy", 0.9)]),
        ])]);

        poller
            .start(&camera(), Arc::new(detector), overlay.clone())
            .await
            .expect("start");

        rx.changed().await.expect("tick");
        poller.stop();

        let frames = overlay.frames();
        assert!(!frames.is_empty());
        assert_eq!(frames[0].boxes.len(), 1);
        assert_eq!((frames[0].width, frames[0].height), (640, 480));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_resets_state() {
        let state = EmotionStateCell::new();
        let mut rx = state.subscribe();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        let detector = ScriptedDetector::cycling(vec![ScriptStep::Faces(vec![
            detection_with_expressions(&[("happy", 0.9)]),
        ])]);

        poller
            .start(
                &camera(),
                Arc::new(detector),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await
            .expect("start");
        rx.changed().await.expect("tick");

        poller.stop();
        assert!(!poller.is_active());
        assert_eq!(state.get(), EmotionState::NONE);

        // Stopping an idle poller is a no-op.
        poller.stop();
        assert_eq!(state.get(), EmotionState::NONE);
    }

    #[tokio::test]
    async fn starting_while_active_is_a_no_op() {
        let state = EmotionStateCell::new();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());
        let detector: Arc<ScriptedDetector> = Arc::new(ScriptedDetector::new(Vec::new()));
        let overlay = Arc::new(RecordingOverlaySink::new());

        poller
            .start(&camera(), detector.clone(), overlay.clone())
            .await
            .expect("start");
        poller
            .start(&camera(), detector, overlay)
            .await
            .expect("redundant start");
        assert!(poller.is_active());
        poller.stop();
    }

    #[tokio::test]
    async fn camera_denial_keeps_the_poller_idle() {
        let state = EmotionStateCell::new();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        let result = poller
            .start(
                &SyntheticCamera::denied(CameraConfig::default()),
                Arc::new(ScriptedDetector::new(Vec::new())),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await;

        assert_eq!(result.unwrap_err(), CameraError::PermissionDenied);
        assert!(!poller.is_active());
        assert_eq!(state.get(), EmotionState::NONE);
    }

    #[tokio::test]
    async fn no_zombie_write_after_stop_with_inference_in_flight() {
        // Scenario C: stop() while a slow detection call is in flight. The
        // late result must not resurrect state or the timer.
        let state = EmotionStateCell::new();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        let detector = ScriptedDetector::cycling(vec![ScriptStep::Faces(vec![
            detection_with_expressions(&[("happy", 0.9)]),
        ])])
        .with_latency(Duration::from_millis(300));

        poller
            .start(
                &camera(),
                Arc::new(detector),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await
            .expect("start");

        // Let the first tick enter its detect call, then tear down.
        tokio::time::sleep(Duration::from_millis(50)).await;
        poller.stop();
        assert_eq!(state.get(), EmotionState::NONE);

        // Past the detection latency: still NONE, still idle.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(state.get(), EmotionState::NONE);
        assert!(!poller.is_active());
    }

    #[tokio::test]
    async fn state_stays_reset_after_stop_despite_fast_ticks() {
        let state = EmotionStateCell::new();
        let mut poller = EmotionPoller::new(state.clone(), fast_tick());

        // Zero-latency detector producing a face on every tick.
        let detector = ScriptedDetector::cycling(vec![ScriptStep::Faces(vec![
            detection_with_expressions(&[("surprised", 0.9)]),
        ])]);

        poller
            .start(
                &camera(),
                Arc::new(detector),
                Arc::new(RecordingOverlaySink::new()),
            )
            .await
            .expect("start");

        tokio::time::sleep(Duration::from_millis(35)).await;
        poller.stop();
        assert_eq!(state.get(), EmotionState::NONE);

        // Several tick periods later: no tick has written again.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(state.get(), EmotionState::NONE);
    }
}
