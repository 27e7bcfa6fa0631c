// Core ADB types and traits
use super::error::AdbResult;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ImageCapture {
    pub bytes: Vec<u8>,
    pub duration_ms: u128,
}

/// Produces a fresh screen image on request.
///
/// Every call is a single-shot capture; a failure only affects that call.
#[allow(async_fn_in_trait)]
pub trait CaptureProvider {
    /// Encoded image bytes (PNG from `screencap -p`, JPEG is also accepted by the matcher).
    async fn capture(&self) -> AdbResult<Vec<u8>>;
}

/// Delivers synthetic touch input to the device.
#[allow(async_fn_in_trait)]
pub trait DeviceController {
    async fn tap(&self, x: u32, y: u32) -> AdbResult<()>;
    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32, duration: Duration)
    -> AdbResult<()>;
}

// Trait defining ADB capabilities (shell or rust implementations)
#[allow(async_fn_in_trait)]
pub trait AdbClient: CaptureProvider + DeviceController + Send + Sync {
    async fn list_devices() -> AdbResult<Vec<Device>>
    where
        Self: Sized;

    /// Attach to `device_name`, issuing a network connect first when the device
    /// is not yet known to the ADB server.
    async fn connect(device_name: &str) -> AdbResult<Self>
    where
        Self: Sized;

    // High-level capture with timing
    async fn screen_capture(&self) -> AdbResult<ImageCapture> {
        let start = std::time::Instant::now();
        let bytes = self.capture().await?;
        Ok(ImageCapture {
            bytes,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    fn device_name(&self) -> &str;
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Device {
    pub name: String,
    pub transport_id: Option<String>,
}
