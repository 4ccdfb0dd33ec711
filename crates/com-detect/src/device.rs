//! Serial device descriptors
//!
//! A [`DeviceDescriptor`] is identified by its port name alone. Descriptive
//! metadata (description text, USB strings) may change between enumerations
//! of the same physical port without the port being reported as changed.

use std::fmt;
use std::hash::{Hash, Hasher};

use serialport::SerialPortType;

use crate::usb_ids;

/// USB hardware identification for a port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareId {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// USB serial number (if available)
    pub serial_number: Option<String>,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB product string
    pub product: Option<String>,
}

impl HardwareId {
    pub fn new(vid: u16, pid: u16) -> Self {
        Self {
            vid,
            pid,
            serial_number: None,
            manufacturer: None,
            product: None,
        }
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "USB VID:PID={:04X}:{:04X}", self.vid, self.pid)?;
        if let Some(serial) = &self.serial_number {
            write!(f, " SER={}", serial)?;
        }
        Ok(())
    }
}

/// One serial endpoint visible to the host
///
/// Equality and hashing only consider [`id`](Self::id).
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    id: String,
    description: Option<String>,
    hardware_id: Option<HardwareId>,
}

impl DeviceDescriptor {
    /// Create a descriptor with no metadata
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            hardware_id: None,
        }
    }

    /// Attach a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a USB hardware identifier
    pub fn with_hardware_id(mut self, hardware_id: HardwareId) -> Self {
        self.hardware_id = Some(hardware_id);
        self
    }

    /// Create from serialport crate's port info
    pub(crate) fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => {
                let description = usb
                    .product
                    .clone()
                    .or_else(|| usb.manufacturer.clone())
                    .or_else(|| usb_ids::adapter_name(usb.vid).map(str::to_string));
                Self {
                    id: name,
                    description,
                    hardware_id: Some(HardwareId {
                        vid: usb.vid,
                        pid: usb.pid,
                        serial_number: usb.serial_number.clone(),
                        manufacturer: usb.manufacturer.clone(),
                        product: usb.product.clone(),
                    }),
                }
            }
            SerialPortType::PciPort => Self::new(name).with_description("PCI serial port"),
            SerialPortType::BluetoothPort => {
                Self::new(name).with_description("Bluetooth serial port")
            }
            SerialPortType::Unknown => Self::new(name),
        }
    }

    /// Stable port identifier (e.g., /dev/ttyUSB0, COM3)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn hardware_id(&self) -> Option<&HardwareId> {
        self.hardware_id.as_ref()
    }

    /// Display label such as "COM3 (FT232R USB UART)"
    pub fn label(&self) -> String {
        match &self.description {
            Some(description) => format!("{} ({})", self.id, description),
            None => self.id.clone(),
        }
    }
}

impl PartialEq for DeviceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DeviceDescriptor {}

impl Hash for DeviceDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
