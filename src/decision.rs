//! Publish decision: committed light state -> stop waypoint
//!
//! Re-evaluated only on frames where the debouncer committed or re-confirmed;
//! every other frame republishes the previous decision so the output stream
//! stays continuous at frame rate without flicker. A held decision belongs to
//! one light: once the associated light changes it is re-decided from the
//! committed state against the new light's stop waypoint.

use serde::{Deserialize, Serialize};

use crate::association::LightAhead;
use crate::config::defaults::NO_STOP_WAYPOINT;
use crate::debounce::DebounceOutcome;
use crate::types::LightState;

/// Published value: the waypoint to stop at, or none.
///
/// On the wire this is a single integer with `-1` meaning "no stop required".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct StopWaypoint(Option<usize>);

impl StopWaypoint {
    pub const NONE: StopWaypoint = StopWaypoint(None);

    pub const fn at(index: usize) -> Self {
        StopWaypoint(Some(index))
    }

    pub const fn index(self) -> Option<usize> {
        self.0
    }

    pub const fn is_stop(self) -> bool {
        self.0.is_some()
    }

    pub fn to_wire(self) -> i64 {
        self.0
            .and_then(|i| i64::try_from(i).ok())
            .unwrap_or(NO_STOP_WAYPOINT)
    }
}

impl From<i64> for StopWaypoint {
    fn from(value: i64) -> Self {
        usize::try_from(value).map_or(StopWaypoint::NONE, StopWaypoint::at)
    }
}

impl From<StopWaypoint> for i64 {
    fn from(value: StopWaypoint) -> Self {
        value.to_wire()
    }
}

impl std::fmt::Display for StopWaypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Pure decision rule: stop at the light's waypoint only for a committed RED
/// with a light ahead.
pub fn decide(committed: LightState, stop_waypoint: Option<usize>) -> StopWaypoint {
    match stop_waypoint {
        Some(index) if committed.requires_stop() => StopWaypoint::at(index),
        _ => StopWaypoint::NONE,
    }
}

/// Holds the last committed decision between threshold boundaries.
#[derive(Debug, Clone, Default)]
pub struct PublishDecider {
    last: StopWaypoint,
    /// Map index of the light `last` was decided for
    light: Option<usize>,
}

impl PublishDecider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed decision (initially none).
    pub const fn current(&self) -> StopWaypoint {
        self.last
    }

    /// Light the current decision refers to, if any.
    pub const fn decided_for(&self) -> Option<usize> {
        self.light
    }

    /// Value to publish for a frame whose observation went through the
    /// debouncer. Commit / re-confirm frames replace the decision; settling
    /// frames hold it.
    pub fn on_observation(&mut self, outcome: &DebounceOutcome, ahead: &LightAhead) -> StopWaypoint {
        match *outcome {
            DebounceOutcome::Committed { state, .. } => self.record(state, ahead),
            DebounceOutcome::Settling { stable, .. } => self.hold(stable, ahead),
        }
    }

    /// Republish the held decision while it still refers to `ahead`;
    /// otherwise re-decide for `ahead` from the `committed` state.
    pub fn hold(&mut self, committed: LightState, ahead: &LightAhead) -> StopWaypoint {
        if self.light == Some(ahead.light_index) {
            self.last
        } else {
            self.record(committed, ahead)
        }
    }

    /// No light ahead: nothing to stop for, recorded as the committed
    /// decision.
    pub fn on_no_light_ahead(&mut self) -> StopWaypoint {
        self.last = StopWaypoint::NONE;
        self.light = None;
        self.last
    }

    fn record(&mut self, state: LightState, ahead: &LightAhead) -> StopWaypoint {
        self.last = decide(state, Some(ahead.stop_waypoint));
        self.light = Some(ahead.light_index);
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point3, TrafficLight};
    use LightState::{Green, Red, Unknown, Yellow};

    #[test]
    fn only_red_with_light_publishes_stop() {
        assert_eq!(decide(Red, Some(40)), StopWaypoint::at(40));
        assert_eq!(decide(Red, None), StopWaypoint::NONE);
        for state in [Yellow, Green, Unknown] {
            assert_eq!(decide(state, Some(40)), StopWaypoint::NONE);
        }
    }

    #[test]
    fn decide_is_idempotent() {
        let first = decide(Red, Some(12));
        for _ in 0..5 {
            assert_eq!(decide(Red, Some(12)), first);
        }
    }

    #[test]
    fn wire_format_uses_minus_one_sentinel() {
        assert_eq!(StopWaypoint::NONE.to_wire(), -1);
        assert_eq!(StopWaypoint::at(292).to_wire(), 292);
        assert_eq!(StopWaypoint::from(-1), StopWaypoint::NONE);
        assert_eq!(StopWaypoint::from(7), StopWaypoint::at(7));
        assert_eq!(serde_json::to_string(&StopWaypoint::NONE).unwrap(), "-1");
    }

    fn ahead(light_index: usize, stop_waypoint: usize) -> LightAhead {
        LightAhead {
            light_index,
            light: TrafficLight::at(Point3::new(stop_waypoint as f64, 0.0, 5.8)),
            vehicle_waypoint: 0,
            light_waypoint_offset: stop_waypoint,
            stop_waypoint,
            distance_m: stop_waypoint as f64,
        }
    }

    #[test]
    fn settling_frames_republish_previous_decision() {
        let mut decider = PublishDecider::new();
        let commit = DebounceOutcome::Committed { state: Red, changed: true };
        assert_eq!(decider.on_observation(&commit, &ahead(0, 40)), StopWaypoint::at(40));

        let settling = DebounceOutcome::Settling { candidate: Green, count: 1, stable: Red };
        assert_eq!(decider.on_observation(&settling, &ahead(0, 41)), StopWaypoint::at(40));
    }

    #[test]
    fn red_commit_after_none_yields_real_index() {
        let mut decider = PublishDecider::new();
        assert_eq!(decider.on_no_light_ahead(), StopWaypoint::NONE);
        let commit = DebounceOutcome::Committed { state: Red, changed: true };
        assert_eq!(decider.on_observation(&commit, &ahead(0, 3)), StopWaypoint::at(3));
    }

    #[test]
    fn reconfirmed_red_follows_moving_stop_waypoint() {
        let mut decider = PublishDecider::new();
        let commit = DebounceOutcome::Committed { state: Red, changed: true };
        decider.on_observation(&commit, &ahead(0, 40));
        let again = DebounceOutcome::Committed { state: Red, changed: false };
        assert_eq!(decider.on_observation(&again, &ahead(0, 41)), StopWaypoint::at(41));
    }

    #[test]
    fn held_decision_moves_to_new_light() {
        let mut decider = PublishDecider::new();
        let commit = DebounceOutcome::Committed { state: Red, changed: true };
        decider.on_observation(&commit, &ahead(0, 40));

        assert_eq!(decider.hold(Red, &ahead(1, 200)), StopWaypoint::at(200));
        assert_eq!(decider.decided_for(), Some(1));
    }

    #[test]
    fn settling_on_new_light_does_not_republish_old_waypoint() {
        let mut decider = PublishDecider::new();
        let commit = DebounceOutcome::Committed { state: Green, changed: true };
        decider.on_observation(&commit, &ahead(0, 40));

        let settling = DebounceOutcome::Settling { candidate: Red, count: 1, stable: Green };
        assert_eq!(decider.on_observation(&settling, &ahead(1, 90)), StopWaypoint::NONE);
        assert_eq!(decider.decided_for(), Some(1));
    }

    #[test]
    fn no_light_ahead_forgets_light() {
        let mut decider = PublishDecider::new();
        let commit = DebounceOutcome::Committed { state: Red, changed: true };
        decider.on_observation(&commit, &ahead(2, 40));
        decider.on_no_light_ahead();
        assert_eq!(decider.decided_for(), None);
        assert_eq!(decider.current(), StopWaypoint::NONE);
    }
}
