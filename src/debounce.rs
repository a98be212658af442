//! Light-state debouncer
//!
//! Per-frame classification flickers (motion blur, partial occlusion, model
//! uncertainty). A state is committed only after `threshold` consecutive
//! identical observations; until then the previously committed state stays
//! visible. Matching is strictly consecutive: any mismatch restarts the run
//! at 1. There is no decay or timeout.

use crate::types::LightState;

/// Result of feeding one raw observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// Run-length below threshold. `stable` is the unchanged committed state.
    Settling {
        candidate: LightState,
        count: u32,
        stable: LightState,
    },
    /// Threshold reached (or re-confirmed). `changed` is true when the
    /// committed state differs from the one before this observation.
    Committed { state: LightState, changed: bool },
}

impl DebounceOutcome {
    /// The externally visible state after this observation.
    pub const fn stable_state(&self) -> LightState {
        match *self {
            DebounceOutcome::Settling { stable, .. } => stable,
            DebounceOutcome::Committed { state, .. } => state,
        }
    }

    pub const fn is_committed(&self) -> bool {
        matches!(self, DebounceOutcome::Committed { .. })
    }
}

/// Consecutive-match debouncer. Initial state: committed UNKNOWN, no
/// candidate.
#[derive(Debug, Clone)]
pub struct StateDebouncer {
    threshold: u32,
    candidate: Option<LightState>,
    count: u32,
    committed: LightState,
}

impl StateDebouncer {
    /// `threshold` of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            candidate: None,
            count: 0,
            committed: LightState::Unknown,
        }
    }

    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    pub const fn committed(&self) -> LightState {
        self.committed
    }

    pub const fn candidate(&self) -> Option<LightState> {
        self.candidate
    }

    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Feed one raw per-frame observation.
    pub fn observe(&mut self, observation: LightState) -> DebounceOutcome {
        if self.candidate == Some(observation) {
            // Saturate so a long steady run keeps re-confirming
            self.count = self.count.saturating_add(1);
        } else {
            self.candidate = Some(observation);
            self.count = 1;
        }

        if self.count >= self.threshold {
            let changed = self.committed != observation;
            self.committed = observation;
            DebounceOutcome::Committed {
                state: observation,
                changed,
            }
        } else {
            DebounceOutcome::Settling {
                candidate: observation,
                count: self.count,
                stable: self.committed,
            }
        }
    }
}

impl Default for StateDebouncer {
    fn default() -> Self {
        Self::new(crate::config::defaults::STATE_COUNT_THRESHOLD)
    }
}
