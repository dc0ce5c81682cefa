use crate::emotion::{Emotion, EmotionState};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared value holder for [`EmotionState`]: single writer (the polling
/// loop), many readers (the reactive effects). Built on a watch channel so
/// readers can await changes without polling.
#[derive(Clone)]
pub struct EmotionStateCell {
    tx: Arc<watch::Sender<EmotionState>>,
}

impl EmotionStateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(EmotionState::NONE);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, state: EmotionState) {
        // send_replace never fails even with zero receivers.
        let _ = self.tx.send_replace(state);
    }

    pub fn reset(&self) {
        self.set(EmotionState::NONE);
    }

    pub fn get(&self) -> EmotionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EmotionState> {
        self.tx.subscribe()
    }
}

impl Default for EmotionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Last-seen-label diff for edge-triggered effects.
///
/// Expensive effects (speech, tone cues) must re-fire only when the dominant
/// label changes, not on every poll tick. A tick with no face present yields
/// nothing and leaves the last-seen label untouched, so an emotion
/// reappearing after a gap is not re-announced.
#[derive(Clone, Debug, Default)]
pub struct EmotionEdge {
    last: Option<Emotion>,
}

impl EmotionEdge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new label iff it is present and differs from the last
    /// observed one.
    pub fn observe(&mut self, state: &EmotionState) -> Option<Emotion> {
        let current = state.dominant?;
        if self.last == Some(current) {
            return None;
        }
        self.last = Some(current);
        Some(current)
    }
}
