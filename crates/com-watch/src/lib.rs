//! Serial Port Watcher
//!
//! This crate provides the device-change detection engine: a background
//! poller that samples the host's serial ports, diffs each sample against the
//! previous one, and notifies subscribers about attached and detached ports.
//!
//! # Architecture
//!
//! - A [`PortWatcher`] owns at most one polling thread at a time
//! - Every tick calls a [`DeviceEnumerator`](com_detect::DeviceEnumerator)
//!   and diffs the result against the last good snapshot
//! - Changes are delivered synchronously, on the polling thread, to every
//!   subscriber in registration order: `Added` first, then `Removed`
//! - Stopping wakes the polling thread immediately instead of waiting out
//!   the poll interval
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use com_detect::SerialEnumerator;
//! use com_watch::{ChangeEvent, PortWatcher, DEFAULT_POLL_INTERVAL};
//!
//! let watcher = PortWatcher::new(SerialEnumerator::new());
//! watcher.subscribe(|event: &ChangeEvent| {
//!     println!("{:?}", event);
//!     Ok(())
//! });
//!
//! watcher.start(DEFAULT_POLL_INTERVAL).unwrap();
//! // ...
//! watcher.stop(Duration::from_secs(2)).unwrap();
//! ```

pub mod error;
pub mod events;
pub mod state;
pub mod watcher;

pub use error::{HandlerError, WatchError};
pub use events::ChangeEvent;
pub use state::LifecycleState;
pub use watcher::{PortWatcher, SubscriptionId, WatcherConfig, DEFAULT_POLL_INTERVAL};
