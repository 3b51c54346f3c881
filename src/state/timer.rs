use std::time::{Duration, SystemTime};

use crate::dao::models::TimerEntity;

/// Length of a run, in seconds (15 minutes).
pub const DURATION_SECS: u32 = 15 * 60;

/// Shared secret used when the timer document carries no password.
pub const DEFAULT_PASSWORD: &str = "escapeneon";

/// Canonical view of the shared timer document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    /// Team currently on the clock; empty when idle.
    pub team_name: String,
    /// Instant from which elapsed time is measured while running.
    pub anchor_time: Option<SystemTime>,
    /// Countdown is live.
    pub is_running: bool,
    /// Countdown is frozen on `remaining_seconds`.
    pub is_paused: bool,
    /// Authoritative snapshot when not running, stale cache otherwise.
    pub remaining_seconds: u32,
    /// Early-stop secret, [`DEFAULT_PASSWORD`] when unset.
    pub password: Option<String>,
    /// Last merge-write applied to the document.
    pub updated_at: SystemTime,
}

/// Phase derived from the stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// No team on the clock.
    Idle,
    /// Counting down from the anchor.
    Running,
    /// Frozen on the stored snapshot.
    Paused,
    /// Finished (expired or stopped by password) but not reset yet.
    Stopped,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            team_name: String::new(),
            anchor_time: None,
            is_running: false,
            is_paused: false,
            remaining_seconds: DURATION_SECS,
            password: None,
            updated_at: SystemTime::UNIX_EPOCH,
        }
    }
}

impl TimerState {
    /// Classify the document into one of the four timer phases.
    pub fn phase(&self) -> TimerPhase {
        if self.is_running {
            TimerPhase::Running
        } else if self.is_paused {
            TimerPhase::Paused
        } else if self.team_name.is_empty() {
            TimerPhase::Idle
        } else {
            TimerPhase::Stopped
        }
    }

    /// Whether a view should be ticking for this state.
    pub fn is_ticking(&self) -> bool {
        self.is_running && !self.is_paused && self.anchor_time.is_some()
    }

    /// Secret currently guarding the early stop.
    pub fn effective_password(&self) -> &str {
        self.password.as_deref().unwrap_or(DEFAULT_PASSWORD)
    }

    /// Remaining seconds at `now`. See [`derive_remaining`].
    pub fn remaining_at(&self, now: SystemTime) -> u32 {
        derive_remaining(self, now)
    }
}

/// Derive the countdown value every view displays.
///
/// When the timer is not live the stored snapshot is authoritative. While
/// running, the value is recomputed from the shared anchor so that every view
/// reading the same document lands on the same number, regardless of when it
/// joined. An anchor in the future (skewed clock) yields the full duration.
pub fn derive_remaining(state: &TimerState, now: SystemTime) -> u32 {
    let anchor = match state.anchor_time {
        Some(anchor) if state.is_running && !state.is_paused => anchor,
        _ => return state.remaining_seconds.min(DURATION_SECS),
    };

    let elapsed = now
        .duration_since(anchor)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);

    u64::from(DURATION_SECS)
        .saturating_sub(elapsed)
        .try_into()
        .unwrap_or(DURATION_SECS)
}

/// Anchor that makes a resumed countdown continue from `remaining` at `now`.
pub fn backdated_anchor(now: SystemTime, remaining: u32) -> SystemTime {
    let elapsed = DURATION_SECS - remaining.min(DURATION_SECS);
    now.checked_sub(Duration::from_secs(u64::from(elapsed)))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Seconds used by a team that stopped with `remaining` seconds left.
pub fn elapsed_for(remaining: u32) -> u32 {
    DURATION_SECS - remaining.min(DURATION_SECS)
}

impl From<TimerEntity> for TimerState {
    fn from(value: TimerEntity) -> Self {
        Self {
            team_name: value.team_name,
            anchor_time: value.anchor_time,
            is_running: value.is_running,
            is_paused: value.is_paused,
            remaining_seconds: value.remaining_seconds.min(DURATION_SECS),
            password: value.password,
            updated_at: value.updated_at,
        }
    }
}

impl From<TimerState> for TimerEntity {
    fn from(value: TimerState) -> Self {
        Self {
            team_name: value.team_name,
            anchor_time: value.anchor_time,
            is_running: value.is_running,
            is_paused: value.is_paused,
            remaining_seconds: value.remaining_seconds,
            password: value.password,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn running_from(anchor: u64) -> TimerState {
        TimerState {
            team_name: "Team A".into(),
            anchor_time: Some(at(anchor)),
            is_running: true,
            remaining_seconds: DURATION_SECS,
            ..TimerState::default()
        }
    }

    #[test]
    fn five_minutes_in_leaves_ten() {
        assert_eq!(derive_remaining(&running_from(0), at(300)), 600);
    }

    #[test]
    fn derivation_floors_partial_seconds() {
        let state = running_from(0);
        let now = at(300) + Duration::from_millis(999);
        assert_eq!(derive_remaining(&state, now), 600);
    }

    #[test]
    fn reaches_zero_at_duration_and_stays_there() {
        let state = running_from(0);
        assert_eq!(derive_remaining(&state, at(899)), 1);
        assert_eq!(derive_remaining(&state, at(900)), 0);
        assert_eq!(derive_remaining(&state, at(5_000)), 0);
    }

    #[test]
    fn derivation_is_monotonic_while_running() {
        let state = running_from(1_000);
        let mut previous = u32::MAX;
        for t in (900..3_000).step_by(7) {
            let current = derive_remaining(&state, at(t));
            assert!(current <= previous, "went up at t={t}");
            previous = current;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn stored_value_wins_when_not_running() {
        let paused = TimerState {
            is_running: false,
            is_paused: true,
            remaining_seconds: 600,
            ..running_from(0)
        };
        assert_eq!(derive_remaining(&paused, at(300)), 600);
        assert_eq!(derive_remaining(&paused, at(100_000)), 600);

        let missing_anchor = TimerState {
            anchor_time: None,
            remaining_seconds: 42,
            ..running_from(0)
        };
        assert_eq!(derive_remaining(&missing_anchor, at(10)), 42);
    }

    #[test]
    fn future_anchor_clamps_to_full_duration() {
        assert_eq!(derive_remaining(&running_from(500), at(100)), DURATION_SECS);
    }

    #[test]
    fn backdated_anchor_matches_remaining() {
        assert_eq!(backdated_anchor(at(1_000), 600), at(700));
        assert_eq!(backdated_anchor(at(1_000), DURATION_SECS), at(1_000));
    }

    #[test]
    fn phases_follow_flags() {
        assert_eq!(TimerState::default().phase(), TimerPhase::Idle);
        assert_eq!(running_from(0).phase(), TimerPhase::Running);
        let stopped = TimerState {
            is_running: false,
            remaining_seconds: 0,
            ..running_from(0)
        };
        assert_eq!(stopped.phase(), TimerPhase::Stopped);
    }

    #[test]
    fn password_falls_back_to_default() {
        assert_eq!(TimerState::default().effective_password(), DEFAULT_PASSWORD);
        let custom = TimerState {
            password: Some("vault".into()),
            ..TimerState::default()
        };
        assert_eq!(custom.effective_password(), "vault");
    }
}
