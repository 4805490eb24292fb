use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// How a new pause request combines with one that is still running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PauseMode {
    /// Drop whatever is left and start over.
    #[default]
    Reset,
    /// Stack the new duration on top of the remainder.
    Extend,
    /// Keep whichever of remainder and new duration is longer.
    Max,
}

impl PauseMode {
    /// Length of the pause that starts now, given what is left of the old one.
    pub fn compose(self, remaining: Duration, requested: Duration) -> Duration {
        match self {
            PauseMode::Reset => requested,
            PauseMode::Extend => remaining.saturating_add(requested),
            PauseMode::Max => remaining.max(requested),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PauseStatus {
    Idle,
    Paused,
}

/// `active == started_at.is_some()`; an active pause ends at
/// `started_at + planned`.
#[derive(Debug, Clone, Default)]
pub struct PauseState {
    started_at: Option<Instant>,
    planned: Duration,
}

impl PauseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn status(&self) -> PauseStatus {
        if self.is_active() {
            PauseStatus::Paused
        } else {
            PauseStatus::Idle
        }
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn planned(&self) -> Duration {
        self.planned
    }

    pub fn until(&self) -> Option<Instant> {
        self.started_at.map(|start| start + self.planned)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.until()
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }

    /// True once an active pause has run its course, whether or not the
    /// expiry timer ever fired.
    pub fn is_due(&self, now: Instant) -> bool {
        self.until().is_some_and(|until| now >= until)
    }

    /// Applies a pause request under `mode` and returns the planned duration
    /// of the pause now in effect.
    pub fn request(&mut self, mode: PauseMode, requested: Duration, now: Instant) -> Duration {
        let remaining = self.remaining(now);
        let planned = mode.compose(remaining, requested);
        self.started_at = Some(now);
        self.planned = planned;
        planned
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn remaining_after_second_request(mode: PauseMode, second: Duration) -> Duration {
        let start = Instant::now();
        let mut state = PauseState::new();
        state.request(mode, secs(10), start);

        let later = start + secs(4);
        state.request(mode, second, later);
        state.remaining(later)
    }

    #[test]
    fn reset_discards_the_remainder() {
        assert_eq!(remaining_after_second_request(PauseMode::Reset, secs(3)), secs(3));
    }

    #[test]
    fn extend_stacks_onto_the_remainder() {
        assert_eq!(remaining_after_second_request(PauseMode::Extend, secs(3)), secs(9));
    }

    #[test]
    fn max_keeps_the_longer_of_the_two() {
        assert_eq!(remaining_after_second_request(PauseMode::Max, secs(3)), secs(6));
        assert_eq!(remaining_after_second_request(PauseMode::Max, secs(20)), secs(20));
    }

    #[test]
    fn every_mode_starts_fresh_from_idle() {
        for mode in [PauseMode::Reset, PauseMode::Extend, PauseMode::Max] {
            let now = Instant::now();
            let mut state = PauseState::new();
            assert_eq!(state.request(mode, secs(7), now), secs(7));
            assert_eq!(state.until(), Some(now + secs(7)));
        }
    }

    #[test]
    fn expired_remainder_counts_as_zero() {
        let start = Instant::now();
        let mut state = PauseState::new();
        state.request(PauseMode::Extend, secs(2), start);

        let later = start + secs(5);
        assert!(state.is_due(later));
        assert_eq!(state.request(PauseMode::Extend, secs(3), later), secs(3));
    }

    #[test]
    fn active_tracks_start_instant() {
        let mut state = PauseState::new();
        assert!(!state.is_active());
        assert_eq!(state.status(), PauseStatus::Idle);

        state.request(PauseMode::Reset, secs(1), Instant::now());
        assert!(state.is_active());
        assert!(state.started_at().is_some());

        state.clear();
        assert!(!state.is_active());
        assert_eq!(state.until(), None);
        assert_eq!(state.planned(), Duration::ZERO);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PauseMode::Max).unwrap(), "\"max\"");
        let mode: PauseMode = serde_json::from_str("\"extend\"").unwrap();
        assert_eq!(mode, PauseMode::Extend);
    }
}
