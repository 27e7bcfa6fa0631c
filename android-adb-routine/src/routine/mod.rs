// Stage routine module
// Runs a declarative plan of template matches and taps, round after round,
// with cooperative cancellation.

pub mod interrupt;
pub mod plan;
pub mod sequencer;
pub mod types;


// Re-export the main types and functions for easy access
pub use interrupt::{FORCED_EXIT_CODE, InterruptAction, on_interrupt};
pub use plan::{Pause, PlanError, PlanStep, SequencePlan, Stage};
pub use sequencer::{RunState, SETTLE_DELAY, StageSequencer};
pub use types::{PlanOutcome, RoutineState, RoutineStatus};
