//! Serial port scanner
//!
//! This module provides the [`DeviceEnumerator`] seam and its real
//! implementation over the host's serial port list.

use serialport::available_ports;
use tracing::{debug, trace};

use crate::device::DeviceDescriptor;
use crate::error::DetectError;
use crate::snapshot::DeviceSnapshot;

/// Source of device snapshots
///
/// Each call is independent. A failed call is transient: callers are
/// expected to retry on their next poll.
pub trait DeviceEnumerator: Send + Sync {
    /// List the devices visible right now
    fn enumerate(&self) -> Result<DeviceSnapshot, DetectError>;
}

impl<F> DeviceEnumerator for F
where
    F: Fn() -> Result<DeviceSnapshot, DetectError> + Send + Sync,
{
    fn enumerate(&self) -> Result<DeviceSnapshot, DetectError> {
        self()
    }
}

/// Serial port scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Skip ports whose name contains any of these patterns
    pub skip_patterns: Vec<String>,
}

/// Enumerates the host's serial ports
#[derive(Debug, Clone, Default)]
pub struct SerialEnumerator {
    config: ScannerConfig,
}

impl SerialEnumerator {
    /// Create a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Check if a port should be skipped
    fn should_skip_port(&self, port_name: &str) -> bool {
        self.config
            .skip_patterns
            .iter()
            .any(|pattern| port_name.contains(pattern.as_str()))
    }
}

impl DeviceEnumerator for SerialEnumerator {
    fn enumerate(&self) -> Result<DeviceSnapshot, DetectError> {
        trace!("Enumerating serial ports...");
        let ports = available_ports()?;

        let snapshot: DeviceSnapshot = ports
            .into_iter()
            .filter(|p| !self.should_skip_port(&p.port_name))
            .map(|p| DeviceDescriptor::from_serialport(p.port_name, &p.port_type))
            .collect();

        debug!("Found {} serial port(s)", snapshot.len());
        Ok(snapshot)
    }
}
