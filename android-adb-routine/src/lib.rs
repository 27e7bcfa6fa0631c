pub mod adb;
pub mod args;
pub mod config;
pub mod routine;
pub mod template_matching;

pub use adb::{AdbBackend, BackendKind, CaptureProvider, DeviceController};
pub use config::RunConfig;
pub use routine::{RoutineState, SequencePlan, StageSequencer};
pub use template_matching::{MatchResult, TemplateMatcher};
