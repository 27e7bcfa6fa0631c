use super::error::AdbResult;
use super::rust_impl::RustAdb;
use super::shell::AdbShell;
use super::types::{AdbClient, CaptureProvider, Device, DeviceController, ImageCapture};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which transport drives the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External `adb` binary
    #[default]
    Shell,
    /// `adb_client` speaking to the ADB server directly
    Rust,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "shell" => Some(BackendKind::Shell),
            "rust" => Some(BackendKind::Rust),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Shell => "shell",
            BackendKind::Rust => "rust",
        }
    }
}

pub enum AdbBackend {
    Shell(AdbShell),
    Rust(RustAdb),
}

impl AdbBackend {
    pub async fn list_devices(kind: BackendKind) -> AdbResult<Vec<Device>> {
        match kind {
            BackendKind::Shell => AdbShell::list_devices().await,
            BackendKind::Rust => RustAdb::list_devices().await,
        }
    }

    pub async fn connect_with(device_name: &str, kind: BackendKind) -> AdbResult<Self> {
        match kind {
            BackendKind::Shell => Ok(AdbBackend::Shell(AdbShell::connect(device_name).await?)),
            BackendKind::Rust => Ok(AdbBackend::Rust(RustAdb::connect(device_name).await?)),
        }
    }

    pub fn device_name(&self) -> &str {
        match self {
            AdbBackend::Shell(s) => s.device_name(),
            AdbBackend::Rust(r) => r.device_name(),
        }
    }

    pub async fn screen_capture(&self) -> AdbResult<ImageCapture> {
        match self {
            AdbBackend::Shell(s) => s.screen_capture().await,
            AdbBackend::Rust(r) => r.screen_capture().await,
        }
    }
}

impl CaptureProvider for AdbBackend {
    async fn capture(&self) -> AdbResult<Vec<u8>> {
        match self {
            AdbBackend::Shell(s) => s.capture().await,
            AdbBackend::Rust(r) => r.capture().await,
        }
    }
}

impl DeviceController for AdbBackend {
    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.tap(x, y).await,
            AdbBackend::Rust(r) => r.tap(x, y).await,
        }
    }

    async fn swipe(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration: Duration,
    ) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.swipe(x1, y1, x2, y2, duration).await,
            AdbBackend::Rust(r) => r.swipe(x1, y1, x2, y2, duration).await,
        }
    }
}
