// Types and enums for the stage routine
use serde::Serialize;

/// Lifecycle of one run: `Idle -> Running -> (Cancelled | RoundLimitReached) -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoutineState {
    Idle,
    Running,
    Cancelled,
    RoundLimitReached,
    Stopped,
}

/// Snapshot published to observers whenever the state or round changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutineStatus {
    pub state: RoutineState,
    /// 1-based index of the current round, 0 before the first round starts
    pub round: u32,
}

impl Default for RoutineStatus {
    fn default() -> Self {
        Self {
            state: RoutineState::Idle,
            round: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    Completed,
    /// Cancellation was observed at a polling point; remaining steps were skipped
    Cancelled,
}
