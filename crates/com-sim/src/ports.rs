//! Virtual serial ports
//!
//! A shared set of simulated ports. Attaching or detaching a port is seen by
//! the next `enumerate` call, just like plugging a USB adapter in or out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use com_detect::{DetectError, DeviceDescriptor, DeviceEnumerator, DeviceSnapshot, HardwareId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for a simulated port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualPortConfig {
    /// Port name reported to the watcher
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// USB vendor id to report
    #[serde(default)]
    pub vid: Option<u16>,
    /// USB product id to report
    #[serde(default)]
    pub pid: Option<u16>,
}

impl VirtualPortConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some("Simulated serial port".to_string()),
            vid: None,
            pid: None,
        }
    }

    fn to_descriptor(&self) -> DeviceDescriptor {
        let mut device = DeviceDescriptor::new(self.name.clone());
        if let Some(description) = &self.description {
            device = device.with_description(description.clone());
        }
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            device = device.with_hardware_id(HardwareId::new(vid, pid));
        }
        device
    }
}

#[derive(Debug, Default)]
struct PortSet {
    ports: Vec<VirtualPortConfig>,
    failure: Option<String>,
}

/// Shared set of simulated ports
///
/// Clones refer to the same set.
#[derive(Debug, Clone, Default)]
pub struct VirtualPorts {
    inner: Arc<Mutex<PortSet>>,
}

impl VirtualPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set with these ports already attached
    pub fn with_ports(ports: impl IntoIterator<Item = VirtualPortConfig>) -> Self {
        let set = Self::new();
        for port in ports {
            set.attach(port);
        }
        set
    }

    fn lock(&self) -> MutexGuard<'_, PortSet> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a port. Returns false if a port with that name is present.
    pub fn attach(&self, port: VirtualPortConfig) -> bool {
        let mut set = self.lock();
        if set.ports.iter().any(|p| p.name == port.name) {
            return false;
        }
        debug!("Virtual port {} attached", port.name);
        set.ports.push(port);
        true
    }

    /// Detach a port by name. Returns false if it was not attached.
    pub fn detach(&self, name: &str) -> bool {
        let mut set = self.lock();
        let before = set.ports.len();
        set.ports.retain(|p| p.name != name);
        let removed = set.ports.len() != before;
        if removed {
            debug!("Virtual port {} detached", name);
        }
        removed
    }

    /// Whether a port with this name is attached
    pub fn is_attached(&self, name: &str) -> bool {
        self.lock().ports.iter().any(|p| p.name == name)
    }

    /// Make subsequent enumerations fail (`Some`) or succeed again (`None`)
    pub fn set_failure(&self, reason: Option<String>) {
        self.lock().failure = reason;
    }
}

impl DeviceEnumerator for VirtualPorts {
    fn enumerate(&self) -> Result<DeviceSnapshot, DetectError> {
        let set = self.lock();
        if let Some(reason) = &set.failure {
            return Err(DetectError::EnumerationFailed(reason.clone()));
        }
        Ok(set.ports.iter().map(VirtualPortConfig::to_descriptor).collect())
    }
}
