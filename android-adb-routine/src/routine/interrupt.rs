//! Ctrl-C handling for a running routine
//!
//! The first interrupt cancels the token so the routine stops at its next
//! checkpoint. Any later interrupt asks for an immediate exit, since the
//! routine may be inside a long wait or a hung device call.

use tokio_util::sync::CancellationToken;

/// Process exit code after a forced stop (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Token was cancelled; wait for the routine to reach a checkpoint
    Cancel,
    /// Cancellation was already requested; exit now
    ForceExit,
}

pub fn on_interrupt(cancel: &CancellationToken) -> InterruptAction {
    if cancel.is_cancelled() {
        return InterruptAction::ForceExit;
    }
    cancel.cancel();
    InterruptAction::Cancel
}
