//! Navigation state machine.

use std::fmt;

/// Where a navigation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    /// Route resolved through the registry.
    Matched,
    /// Interceptor chain running.
    Intercepting,
    /// Chain continued; the target is about to run.
    Resolved,
    Completed,
    Failed,
}

impl NavigationState {
    /// Whether `self → next` is a legal step.
    pub fn can_transition_to(self, next: NavigationState) -> bool {
        use NavigationState::*;
        match (self, next) {
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Matched) => true,
            // Cache hits skip registry resolution.
            (Idle, Intercepting) => true,
            (Matched, Intercepting) => true,
            (Intercepting, Resolved) => true,
            // Redirect.
            (Intercepting, Idle) => true,
            (Resolved, Completed) => true,
            _ => false,
        }
    }

    /// Cancellation is only honoured before the target runs.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            NavigationState::Idle | NavigationState::Matched | NavigationState::Intercepting
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NavigationState::Completed | NavigationState::Failed)
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigationState::Idle => "idle",
            NavigationState::Matched => "matched",
            NavigationState::Intercepting => "intercepting",
            NavigationState::Resolved => "resolved",
            NavigationState::Completed => "completed",
            NavigationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one navigation's state for tracing.
#[derive(Debug)]
pub(crate) struct StateTracker {
    url: String,
    state: NavigationState,
}

impl StateTracker {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            state: NavigationState::Idle,
        }
    }

    pub(crate) fn state(&self) -> NavigationState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: NavigationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal navigation transition {} -> {next}",
            self.state
        );
        tracing::trace!(url = %self.url, from = %self.state, to = %next, "Navigation state");
        self.state = next;
    }

    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = NavigationState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NavigationState::*;

    #[test]
    fn test_happy_path() {
        let mut tracker = StateTracker::new("/a");
        for next in [Matched, Intercepting, Resolved, Completed] {
            tracker.advance(next);
        }
        assert_eq!(tracker.state(), Completed);
    }

    #[test]
    fn test_cache_hit_and_redirect_paths() {
        assert!(Idle.can_transition_to(Intercepting));
        assert!(Intercepting.can_transition_to(Idle));
        assert!(!Matched.can_transition_to(Resolved));
        assert!(!Idle.can_transition_to(Completed));
    }

    #[test]
    fn test_failed_reachable_until_terminal() {
        for state in [Idle, Matched, Intercepting, Resolved] {
            assert!(state.can_transition_to(Failed));
        }
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Idle));

        let mut tracker = StateTracker::new("/a");
        tracker.advance(Matched);
        tracker.fail();
        assert_eq!(tracker.state(), Failed);
        tracker.fail();
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_cancellable_before_resolved() {
        assert!(Intercepting.is_cancellable());
        assert!(!Resolved.is_cancellable());
    }
}
