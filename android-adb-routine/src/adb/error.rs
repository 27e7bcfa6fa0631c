use thiserror::Error;

/// A specialized `Result` type for ADB operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all ADB-related operations.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error(
        "'adb' binary not found in PATH. Install Android Platform Tools (https://developer.android.com/tools/adb) or run with --impl=rust."
    )]
    AdbNotFound,

    #[error("Failed to invoke '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("adb connect {device} failed: {output}")]
    ConnectFailed { device: String, output: String },

    #[error("Device '{device}' not found")]
    DeviceNotFound { device: String },

    #[error("'{device}' is neither a known device serial nor an IPv4 address:port")]
    InvalidAddress { device: String },

    #[error("ADB client error: {source}")]
    Client {
        #[from]
        source: adb_client::RustADBError,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("Screen capture returned no data")]
    EmptyCapture,

    #[error("Failed to write capture to {path}: {source}")]
    WriteCapture {
        path: String,
        source: std::io::Error,
    },
}

impl AdbError {
    /// Output of `adb connect` reports failure on stdout with a zero exit code.
    pub fn is_connect_refusal(output: &str) -> bool {
        let lower = output.to_lowercase();
        lower.contains("connection refused")
            || lower.contains("failed to connect")
            || lower.contains("cannot connect")
            || lower.contains("unable to connect")
    }
}
