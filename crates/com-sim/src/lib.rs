//! Serial Port Simulation Library
//!
//! This crate provides enumerators that stand in for the host's serial port
//! list, so the port watcher can be exercised without physical hardware:
//!
//! - **ScriptedEnumerator**: Replays a fixed sequence of snapshots and failures
//! - **VirtualPorts**: A shared, mutable set of ports that can be attached and
//!   detached at runtime
//!
//! # Example
//!
//! ```rust
//! use com_detect::DeviceEnumerator;
//! use com_sim::{VirtualPortConfig, VirtualPorts};
//!
//! let ports = VirtualPorts::new();
//! ports.attach(VirtualPortConfig::new("SIM0"));
//!
//! let snapshot = ports.enumerate().unwrap();
//! assert!(snapshot.contains("SIM0"));
//!
//! ports.detach("SIM0");
//! assert!(ports.enumerate().unwrap().is_empty());
//! ```

pub mod ports;
pub mod script;

pub use ports::{VirtualPortConfig, VirtualPorts};
pub use script::ScriptedEnumerator;
