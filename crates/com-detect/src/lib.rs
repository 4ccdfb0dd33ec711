//! Serial Port Detection Library
//!
//! This crate provides serial port enumeration as point-in-time snapshots
//! that can be diffed against each other to find attached and detached ports.
//!
//! # Example
//!
//! ```rust,no_run
//! use com_detect::{DeviceEnumerator, SerialEnumerator};
//!
//! let enumerator = SerialEnumerator::new();
//! let snapshot = enumerator.enumerate().unwrap();
//!
//! for device in snapshot.iter() {
//!     println!("Found port: {}", device.id());
//! }
//! ```

pub mod device;
pub mod error;
pub mod scanner;
pub mod snapshot;
pub mod usb_ids;

pub use device::{DeviceDescriptor, HardwareId};
pub use error::DetectError;
pub use scanner::{DeviceEnumerator, ScannerConfig, SerialEnumerator};
pub use snapshot::{DeviceSnapshot, SnapshotDiff};
