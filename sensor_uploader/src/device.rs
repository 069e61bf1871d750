use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::UploaderConfig;

const MACHINE_ID_PATH: &str = "/etc/machine-id";
const UNKNOWN_DEVICE: &str = "unknown-device";

/// Supplies the identifier sent with every batch. Read once per send.
pub trait DeviceIdentity: Send + Sync {
    fn device_id(&self) -> String;
}

/// Identifier fixed by configuration (or handed over by a mobile shell)
#[derive(Debug, Clone)]
pub struct StaticDeviceId(String);

impl StaticDeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl DeviceIdentity for StaticDeviceId {
    fn device_id(&self) -> String {
        self.0.clone()
    }
}

/// Host identifier: machine-id file, then $HOSTNAME, then a fixed placeholder
#[derive(Debug, Clone)]
pub struct HostDeviceId {
    machine_id_path: PathBuf,
}

impl HostDeviceId {
    pub fn new() -> Self {
        Self::with_path(MACHINE_ID_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            machine_id_path: path.into(),
        }
    }
}

impl Default for HostDeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceIdentity for HostDeviceId {
    fn device_id(&self) -> String {
        if let Ok(contents) = fs::read_to_string(&self.machine_id_path) {
            let id = contents.trim();
            if !id.is_empty() {
                return id.to_string();
            }
        }

        match std::env::var("HOSTNAME") {
            Ok(host) if !host.trim().is_empty() => host.trim().to_string(),
            _ => {
                log::warn!(
                    "No device identifier found at {}, using {}",
                    self.machine_id_path.display(),
                    UNKNOWN_DEVICE
                );
                UNKNOWN_DEVICE.to_string()
            }
        }
    }
}

/// Pick the identity provider for a configuration
pub fn provider_for(config: &UploaderConfig) -> Arc<dyn DeviceIdentity> {
    match &config.device_id {
        Some(id) => Arc::new(StaticDeviceId::new(id.clone())),
        None => Arc::new(HostDeviceId::new()),
    }
}
