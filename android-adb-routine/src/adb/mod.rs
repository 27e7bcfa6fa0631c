// ADB module - device transport for captures, taps and swipes.
// Two interchangeable backends: the external `adb` binary, and the
// `adb_client` crate talking to the ADB server.

pub mod backend;
pub mod error;
pub mod rust_impl;
pub mod shell;
pub mod types;


// Re-export the main types and functions for easy access
pub use backend::{AdbBackend, BackendKind};
pub use error::{AdbError, AdbResult};
pub use rust_impl::RustAdb;
pub use shell::AdbShell;
pub use types::{AdbClient, CaptureProvider, Device, DeviceController, ImageCapture};
