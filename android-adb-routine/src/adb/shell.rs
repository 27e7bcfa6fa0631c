use super::error::{AdbError, AdbResult};
use super::types::{AdbClient, CaptureProvider, Device, DeviceController};
use std::time::Duration;
use tokio::process::Command;

/// Backend that drives the external `adb` binary, addressing one device by serial.
pub struct AdbShell {
    pub device: Device,
}

impl AdbShell {
    fn ensure_adb_available() -> AdbResult<()> {
        match std::process::Command::new("adb").arg("version").output() {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(AdbError::CommandFailed {
                command: "adb version".to_string(),
                stderr: format!(
                    "returned {}. Ensure Android Platform Tools are properly installed, or restart with --impl=rust.",
                    out.status
                ),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AdbError::AdbNotFound),
            Err(source) => Err(AdbError::Spawn {
                command: "adb version".to_string(),
                source,
            }),
        }
    }

    async fn run_adb(args: &[&str]) -> AdbResult<Vec<u8>> {
        let command = format!("adb {}", args.join(" "));
        let output = Command::new("adb")
            .args(args)
            .output()
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    AdbError::AdbNotFound
                } else {
                    AdbError::Spawn {
                        command: command.clone(),
                        source,
                    }
                }
            })?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn device_command(&self, args: &[&str]) -> AdbResult<Vec<u8>> {
        let mut full = vec!["-s", self.device.name.as_str()];
        full.extend_from_slice(args);
        Self::run_adb(&full).await
    }

    pub fn parse_devices(output: &str) -> Vec<Device> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 2 && parts[1] == "device" {
                    let transport_id = parts
                        .iter()
                        .find_map(|part| part.strip_prefix("transport_id:"))
                        .map(str::to_string);
                    Some(Device {
                        name: parts[0].to_string(),
                        transport_id,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    async fn find_device(device_name: &str) -> AdbResult<Option<Device>> {
        Ok(Self::list_devices()
            .await?
            .into_iter()
            .find(|d| d.name == device_name))
    }
}

impl CaptureProvider for AdbShell {
    async fn capture(&self) -> AdbResult<Vec<u8>> {
        let bytes = self.device_command(&["exec-out", "screencap", "-p"]).await?;
        if bytes.is_empty() {
            return Err(AdbError::EmptyCapture);
        }
        Ok(bytes)
    }
}

impl DeviceController for AdbShell {
    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        let (xs, ys) = (x.to_string(), y.to_string());
        self.device_command(&["shell", "input", "tap", &xs, &ys])
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
        let parts = [
            x1.to_string(),
            y1.to_string(),
            x2.to_string(),
            y2.to_string(),
            duration.as_millis().to_string(),
        ];
        let mut args = vec!["shell", "input", "swipe"];
        args.extend(parts.iter().map(String::as_str));
        self.device_command(&args).await.map(|_| ())
    }
}

impl AdbClient for AdbShell {
    async fn list_devices() -> AdbResult<Vec<Device>> {
        Self::ensure_adb_available()?;
        let stdout = Self::run_adb(&["devices", "-l"]).await?;
        Ok(Self::parse_devices(&String::from_utf8_lossy(&stdout)))
    }

    async fn connect(device_name: &str) -> AdbResult<Self> {
        if let Some(device) = Self::find_device(device_name).await? {
            log::debug!("📱 {} already attached", device.name);
            return Ok(Self { device });
        }

        log::info!("🔌 adb connect {device_name}");
        let output = Command::new("adb")
            .arg("connect")
            .arg(device_name)
            .output()
            .await
            .map_err(|source| AdbError::Spawn {
                command: format!("adb connect {device_name}"),
                source,
            })?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !output.status.success() || AdbError::is_connect_refusal(&combined) {
            return Err(AdbError::ConnectFailed {
                device: device_name.to_string(),
                output: combined.trim().to_string(),
            });
        }

        match Self::find_device(device_name).await? {
            Some(device) => Ok(Self { device }),
            None => Err(AdbError::DeviceNotFound {
                device: device_name.to_string(),
            }),
        }
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
