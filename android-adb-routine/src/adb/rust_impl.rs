// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{AdbClient, CaptureProvider, Device, DeviceController};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Backend that talks to the local ADB server over its socket protocol.
pub struct RustAdb {
    device: Device,
    server_device: Arc<Mutex<ADBServerDevice>>,
    /// Physical size from `wm size`, needed to read raw framebuffers
    screen_size: Option<(u32, u32)>,
}

/// Physical `(width, height)` from `wm size` output.
pub(crate) fn parse_wm_size(output: &str) -> Option<(u32, u32)> {
    let size = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Physical size:"))?;
    let (w, h) = size.trim().split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn encode_png(img: DynamicImage) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).ok()?;
    Some(out)
}

/// Turn `framebuffer_bytes()` output into an encoded image.
///
/// Already-encoded data (PNG, JPEG) passes through. Raw RGBA or RGB data is
/// read from the tail of the buffer, skipping any header, and needs the
/// screen size. Anything else yields `None` so the caller can fall back.
pub(crate) fn framebuffer_to_image(data: Vec<u8>, size: Option<(u32, u32)>) -> Option<Vec<u8>> {
    if image::guess_format(&data).is_ok() {
        return Some(data);
    }
    let (width, height) = size?;
    let pixels = width as usize * height as usize;
    if data.len() >= pixels * 4 {
        let raw = data[data.len() - pixels * 4..].to_vec();
        encode_png(DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, raw)?))
    } else if data.len() >= pixels * 3 {
        let raw = data[data.len() - pixels * 3..].to_vec();
        encode_png(DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw)?))
    } else {
        None
    }
}

impl RustAdb {
    /// Run `args` through `adb shell` on a blocking thread and collect stdout.
    async fn shell(&self, args: Vec<String>) -> AdbResult<Vec<u8>> {
        let server_device = Arc::clone(&self.server_device);
        tokio::task::spawn_blocking(move || -> AdbResult<Vec<u8>> {
            let mut out: Vec<u8> = Vec::new();
            let mut dev = server_device.blocking_lock();
            let refs: Vec<&str> = args.iter().map(String::as_str).collect();
            dev.shell_command(&refs, &mut out)?;
            Ok(out)
        })
        .await?
    }
}

impl CaptureProvider for RustAdb {
    /// Framebuffer first, `screencap -p` when it fails or is unreadable.
    async fn capture(&self) -> AdbResult<Vec<u8>> {
        let server_device = Arc::clone(&self.server_device);
        let framebuffer = tokio::task::spawn_blocking(move || {
            let mut dev = server_device.blocking_lock();
            dev.framebuffer_bytes()
        })
        .await?;
        match framebuffer {
            Ok(data) => match framebuffer_to_image(data, self.screen_size) {
                Some(bytes) => return Ok(bytes),
                None => log::debug!("📸 Unrecognised framebuffer format, falling back to screencap"),
            },
            Err(e) => log::debug!("📸 Framebuffer capture failed ({e}), falling back to screencap"),
        }

        let bytes = self
            .shell(vec!["screencap".into(), "-p".into()])
            .await?;
        if bytes.is_empty() {
            return Err(AdbError::EmptyCapture);
        }
        Ok(bytes)
    }
}

impl DeviceController for RustAdb {
    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        self.shell(vec![
            "input".into(),
            "tap".into(),
            x.to_string(),
            y.to_string(),
        ])
        .await
        .map(|_| ())
    }

    async fn swipe(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration: Duration,
    ) -> AdbResult<()> {
        self.shell(vec![
            "input".into(),
            "swipe".into(),
            x1.to_string(),
            y1.to_string(),
            x2.to_string(),
            y2.to_string(),
            duration.as_millis().to_string(),
        ])
        .await
        .map(|_| ())
    }
}

impl AdbClient for RustAdb {
    async fn list_devices() -> AdbResult<Vec<Device>> {
        let mut server = ADBServer::default();
        let device_list = tokio::task::spawn_blocking(move || server.devices()).await??;
        Ok(device_list
            .into_iter()
            .map(|d| Device {
                name: d.identifier,
                transport_id: None,
            })
            .collect())
    }

    async fn connect(device_name: &str) -> AdbResult<Self> {
        let name = device_name.to_string();
        let server_device = tokio::task::spawn_blocking(move || -> AdbResult<ADBServerDevice> {
            let mut server = ADBServer::default();
            let known = server
                .devices()?
                .into_iter()
                .any(|d| d.identifier == name);
            if !known {
                let address: SocketAddrV4 = name
                    .parse()
                    .map_err(|_| AdbError::InvalidAddress {
                        device: name.clone(),
                    })?;
                log::info!("🔌 Connecting ADB server to {address}");
                server.connect_device(address)?;
            }
            Ok(server.get_device_by_name(&name)?)
        })
        .await??;

        let mut adb = RustAdb {
            device: Device {
                name: device_name.to_string(),
                transport_id: None,
            },
            server_device: Arc::new(Mutex::new(server_device)),
            screen_size: None,
        };
        let wm_size = adb.shell(vec!["wm".into(), "size".into()]).await;
        match wm_size {
            Ok(out) => adb.screen_size = parse_wm_size(&String::from_utf8_lossy(&out)),
            Err(e) => log::debug!("📱 wm size failed: {e}"),
        }
        if let Some((w, h)) = adb.screen_size {
            log::info!("📱 {device_name} screen {w}x{h}");
        }
        Ok(adb)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
