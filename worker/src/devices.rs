//! One-shot capture device listing (`--list`).
//!
//! Probing is diagnostic only and never runs alongside the frame loop. Each
//! platform supplies a [`DeviceProbe`]; devices without a friendly name fall
//! back to an index-only label.

use barcode_worker_common::config::DevicesConfig;
use barcode_worker_common::event::{device_list_line, DeviceInfo};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

/// A capture device answering at some index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Found {
    /// Friendly name, if the platform has one.
    pub label: Option<String>,
}

impl Found {
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

/// Platform capability for finding capture devices by index.
pub trait DeviceProbe: Send {
    /// Look at device `index` once. `None` when it is absent or cannot
    /// capture video.
    fn probe(&self, index: u32) -> Option<Found>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

pub fn default_label(index: u32) -> String {
    format!("Camera {index}")
}

/// Probe indices `0..max_probe` and collect the available ones.
pub fn enumerate(probe: &dyn DeviceProbe, max_probe: u32) -> Vec<DeviceInfo> {
    (0..max_probe)
        .filter_map(|index| {
            let found = probe.probe(index)?;
            Some(DeviceInfo {
                id: index,
                label: found.label.unwrap_or_else(|| default_label(index)),
            })
        })
        .collect()
}

/// Write the listing as exactly one JSON array line.
pub async fn write_listing<W: AsyncWrite + Unpin>(
    probe: &dyn DeviceProbe,
    max_probe: u32,
    writer: &mut W,
) -> std::io::Result<Vec<DeviceInfo>> {
    let devices = enumerate(probe, max_probe);
    info!(
        probe = probe.name(),
        max_probe,
        found = devices.len(),
        "capture device probe complete"
    );
    writer.write_all(device_list_line(&devices).as_bytes()).await?;
    writer.flush().await?;
    Ok(devices)
}

/// The probe for the platform this binary runs on.
#[cfg(target_os = "linux")]
pub async fn platform_probe(_config: &DevicesConfig) -> Box<dyn DeviceProbe> {
    Box::new(v4l2::V4l2Probe::new())
}

#[cfg(windows)]
pub async fn platform_probe(config: &DevicesConfig) -> Box<dyn DeviceProbe> {
    Box::new(pnp::PnpProbe::discover(config.name_timeout()).await)
}

#[cfg(not(any(target_os = "linux", windows)))]
pub async fn platform_probe(_config: &DevicesConfig) -> Box<dyn DeviceProbe> {
    Box::new(UnsupportedProbe)
}

/// Platforms without a native probe: reports nothing.
#[cfg(any(not(any(target_os = "linux", windows)), test))]
pub struct UnsupportedProbe;

#[cfg(any(not(any(target_os = "linux", windows)), test))]
impl DeviceProbe for UnsupportedProbe {
    fn probe(&self, _index: u32) -> Option<Found> {
        None
    }

    fn name(&self) -> &str {
        "unsupported"
    }
}

#[cfg(target_os = "linux")]
pub mod v4l2 {
    use std::path::PathBuf;

    use tracing::debug;
    use v4l::capability::Flags;

    use super::{DeviceProbe, Found};

    /// Opens `/dev/videoN` and asks the driver whether the node captures
    /// video. Metadata and output nodes that share a camera are excluded.
    pub struct V4l2Probe {
        dev_dir: PathBuf,
        sysfs_dir: PathBuf,
    }

    impl V4l2Probe {
        pub fn new() -> Self {
            Self::with_roots("/dev", "/sys/class/video4linux")
        }

        pub fn with_roots(dev_dir: impl Into<PathBuf>, sysfs_dir: impl Into<PathBuf>) -> Self {
            Self {
                dev_dir: dev_dir.into(),
                sysfs_dir: sysfs_dir.into(),
            }
        }

        fn sysfs_name(&self, index: u32) -> Option<String> {
            let path = self.sysfs_dir.join(format!("video{index}")).join("name");
            let name = std::fs::read_to_string(path).ok()?;
            non_empty(&name)
        }
    }

    impl Default for V4l2Probe {
        fn default() -> Self {
            Self::new()
        }
    }

    impl DeviceProbe for V4l2Probe {
        fn probe(&self, index: u32) -> Option<Found> {
            let path = self.dev_dir.join(format!("video{index}"));
            let caps = match v4l::Device::with_path(&path).and_then(|dev| dev.query_caps()) {
                Ok(caps) => caps,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "device node not queryable");
                    return None;
                }
            };

            if !is_capture(caps.capabilities) {
                debug!(
                    path = %path.display(),
                    caps = ?caps.capabilities,
                    "node is not a capture device"
                );
                return None;
            }
            Some(Found {
                label: non_empty(&caps.card).or_else(|| self.sysfs_name(index)),
            })
        }

        fn name(&self) -> &str {
            "v4l2"
        }
    }

    fn is_capture(flags: Flags) -> bool {
        flags.intersects(Flags::VIDEO_CAPTURE | Flags::VIDEO_CAPTURE_MPLANE)
    }

    fn non_empty(name: &str) -> Option<String> {
        let name = name.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        (!name.is_empty()).then(|| name.to_string())
    }

}

#[cfg(any(windows, test))]
pub mod pnp {
    use super::{DeviceProbe, Found};

    /// Friendly names from the Plug and Play camera class. DirectShow
    /// enumerates cameras in the same order, so name N labels index N.
    pub struct PnpProbe {
        names: Vec<String>,
    }

    impl PnpProbe {
        pub fn from_output(stdout: &str) -> Self {
            let names = stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            Self { names }
        }

        #[cfg(windows)]
        pub async fn discover(timeout: std::time::Duration) -> Self {
            use tokio::process::Command;
            use tracing::warn;

            let query = "Get-PnpDevice -Class Camera -Status OK | Select-Object -ExpandProperty FriendlyName";
            let mut cmd = Command::new("powershell");
            cmd.args(["-NoProfile", "-Command", query]).kill_on_drop(true);
            let output = cmd.output();

            match tokio::time::timeout(timeout, output).await {
                Ok(Ok(out)) if out.status.success() => {
                    Self::from_output(&String::from_utf8_lossy(&out.stdout))
                }
                Ok(Ok(out)) => {
                    warn!(status = %out.status, "camera name query failed");
                    Self::from_output("")
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "failed to run powershell for camera names");
                    Self::from_output("")
                }
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "camera name query timed out");
                    Self::from_output("")
                }
            }
        }
    }

    impl DeviceProbe for PnpProbe {
        fn probe(&self, index: u32) -> Option<Found> {
            self.names.get(index as usize).map(Found::named)
        }

        fn name(&self) -> &str {
            "pnp"
        }
    }

}
