use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the interactive session's child process.
///
/// `NotStarted -> Starting` on the first submit, `Starting -> Ready` once the
/// child is spawned and its pipes are captured, `Starting -> Failed` on spawn
/// error. `Ready`/`Streaming` flip to `Streaming` on traffic and to `Finished`
/// when the output stream closes and the exit wait completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    NotStarted = 0,
    Starting = 1,
    Ready = 2,
    Streaming = 3,
    Finished = 4,
    Failed = 5,
}

impl SessionState {
    /// Ready or later with a live process behind it.
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Streaming)
    }
}

/// Atomically readable state cell shared between the caller context and the
/// reader loop. Plain shared fields would leave memory visibility to chance;
/// a single atomic gives both sides a consistent view.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::NotStarted as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::NotStarted,
            1 => SessionState::Starting,
            2 => SessionState::Ready,
            3 => SessionState::Streaming,
            4 => SessionState::Finished,
            _ => SessionState::Failed,
        }
    }

    pub(crate) fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Move to `to` only when currently in `from`. Returns whether the
    /// transition happened.
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_only_from_expected_state() {
        let cell = StateCell::new();
        assert!(cell.transition(SessionState::NotStarted, SessionState::Starting));
        assert!(!cell.transition(SessionState::NotStarted, SessionState::Starting));
        assert_eq!(cell.get(), SessionState::Starting);
    }

    #[test]
    fn live_states() {
        assert!(SessionState::Ready.is_live());
        assert!(SessionState::Streaming.is_live());
        assert!(!SessionState::Finished.is_live());
        assert!(!SessionState::Failed.is_live());
    }
}
