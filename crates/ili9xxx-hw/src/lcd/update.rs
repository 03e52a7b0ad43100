//! Coalesces update requests that arrive while an update is running.

/// Whether an update is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    Flushing,
}

/// Guard around the repaint/flush cycle.
///
/// A request made while another one is repainting only sets the repeat flag;
/// the running request repaints again and flushes once at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateGuard {
    state: UpdateState,
    repeat_requested: bool,
}

impl UpdateGuard {
    /// Creates an idle guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Whether a request arrived during the current pass.
    pub fn repeat_requested(&self) -> bool {
        self.repeat_requested
    }

    /// Starts an update. Returns `false` when one is already running, in which
    /// case a repeat has been requested instead.
    pub fn try_begin(&mut self) -> bool {
        match self.state {
            UpdateState::Flushing => {
                self.repeat_requested = true;
                false
            }
            UpdateState::Idle => {
                self.state = UpdateState::Flushing;
                true
            }
        }
    }

    /// Clears the repeat flag before a repaint pass.
    pub fn start_pass(&mut self) {
        self.repeat_requested = false;
    }

    /// Returns to idle and clears any leftover request.
    pub fn finish(&mut self) {
        self.state = UpdateState::Idle;
        self.repeat_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_request_sets_repeat() {
        let mut guard = UpdateGuard::new();
        assert!(guard.try_begin());
        assert_eq!(guard.state(), UpdateState::Flushing);

        guard.start_pass();
        assert!(!guard.try_begin());
        assert!(guard.repeat_requested());

        guard.start_pass();
        assert!(!guard.repeat_requested());

        guard.finish();
        assert_eq!(guard.state(), UpdateState::Idle);
        assert!(guard.try_begin());
    }
}
