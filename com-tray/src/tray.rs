//! Tray model
//!
//! Headless state behind the tray icon: the ordered port menu, the most
//! recently attached port and the notifications shown for each change.

use std::sync::{Arc, Mutex, Weak};

use com_detect::DeviceSnapshot;
use com_watch::{ChangeEvent, HandlerError, PortWatcher};
use tracing::{debug, info, warn};

use crate::launcher::{LaunchCommand, LaunchError};
use crate::settings::Settings;

/// One entry in the port menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Port identifier
    pub port: String,
    /// Menu label, e.g. "COM3 (USB-SERIAL CH340)"
    pub label: String,
}

/// A desktop notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Port menu and notification state
#[derive(Debug, Default)]
pub struct TrayModel {
    entries: Vec<PortEntry>,
    last_connected: Option<String>,
}

impl TrayModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add menu entries for every port in `snapshot` not already listed
    pub fn seed(&mut self, snapshot: &DeviceSnapshot) {
        for port in snapshot.ids() {
            self.insert(port, snapshot);
        }
    }

    fn insert(&mut self, port: &str, snapshot: &DeviceSnapshot) -> bool {
        if self.entries.iter().any(|e| e.port == port) {
            return false;
        }
        let label = snapshot
            .get(port)
            .map(|d| d.label())
            .unwrap_or_else(|| port.to_string());
        self.entries.push(PortEntry {
            port: port.to_string(),
            label,
        });
        true
    }

    /// Update the menu for a change event and return the notifications to show
    ///
    /// `snapshot` is the snapshot the event was computed from; it provides
    /// labels for added ports.
    pub fn apply(&mut self, event: &ChangeEvent, snapshot: &DeviceSnapshot) -> Vec<Notification> {
        let mut notifications = Vec::new();
        match event {
            ChangeEvent::Added(ports) => {
                for port in ports {
                    debug!("{} added", port);
                    self.insert(port, snapshot);
                    self.last_connected = Some(port.clone());
                    notifications.push(Notification {
                        title: format!("{} is added", port),
                        message: "Click to open terminal".to_string(),
                    });
                }
            }
            ChangeEvent::Removed(ports) => {
                for port in ports {
                    debug!("{} removed", port);
                    self.entries.retain(|e| &e.port != port);
                    self.last_connected = None;
                    notifications.push(Notification {
                        title: format!("{} is removed", port),
                        message: "Click to dismiss".to_string(),
                    });
                }
            }
        }
        notifications
    }

    /// Menu entries in display order
    pub fn entries(&self) -> &[PortEntry] {
        &self.entries
    }

    /// Port names in menu order
    pub fn ports(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.port.as_str()).collect()
    }

    /// Most recently attached port, cleared by any removal
    pub fn last_connected(&self) -> Option<&str> {
        self.last_connected.as_deref()
    }

    /// Resolve a click on the latest notification
    ///
    /// Returns the terminal command for the last connected port, or `None`
    /// if the latest notification was a removal.
    pub fn activate_notification(
        &self,
        settings: &Settings,
    ) -> Option<Result<LaunchCommand, LaunchError>> {
        self.last_connected
            .as_deref()
            .map(|port| LaunchCommand::for_port(settings, port))
    }
}

/// Build the watcher subscriber that drives the tray model
///
/// The watcher is held weakly so the subscriber does not keep it alive.
pub fn subscriber(
    tray: Arc<Mutex<TrayModel>>,
    watcher: Weak<PortWatcher>,
    settings: Arc<Settings>,
) -> impl Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync + 'static {
    move |event: &ChangeEvent| -> Result<(), HandlerError> {
        let watcher = watcher.upgrade().ok_or("port watcher dropped")?;
        let snapshot = watcher.current_snapshot();
        let mut tray = tray
            .lock()
            .map_err(|_| HandlerError::new("tray state poisoned"))?;

        for notification in tray.apply(event, &snapshot) {
            info!("{}: {}", notification.title, notification.message);
        }
        debug!(
            "Ports now {:?}, last connected {:?}",
            tray.ports(),
            tray.last_connected()
        );

        if settings.auto_launch && event.is_added() {
            if let Some(command) = tray.activate_notification(&settings) {
                let pid = command
                    .and_then(|c| c.spawn())
                    .map_err(|e| HandlerError::new(e.to_string()))?;
                debug!("Terminal running with pid {}", pid);
            }
        }

        if tray.entries().is_empty() {
            warn!("No serial ports available");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use com_detect::DeviceDescriptor;
    use com_sim::ScriptedEnumerator;

    fn snapshot(devices: Vec<DeviceDescriptor>) -> DeviceSnapshot {
        devices.into_iter().collect()
    }

    #[test]
    fn test_seed_is_idempotent() {
        let snap = snapshot(vec![
            DeviceDescriptor::new("COM1"),
            DeviceDescriptor::new("COM3").with_description("USB-SERIAL CH340"),
        ]);
        let mut tray = TrayModel::new();
        tray.seed(&snap);
        tray.seed(&snap);

        assert_eq!(tray.ports(), vec!["COM1", "COM3"]);
        assert_eq!(tray.entries()[1].label, "COM3 (USB-SERIAL CH340)");
        assert_eq!(tray.last_connected(), None);
    }

    #[test]
    fn test_added_and_removed() {
        let mut tray = TrayModel::new();
        tray.seed(&snapshot(vec![DeviceDescriptor::new("COM1")]));

        let current = snapshot(vec![
            DeviceDescriptor::new("COM1"),
            DeviceDescriptor::new("COM4").with_description("FT232R USB UART"),
        ]);
        let notes = tray.apply(&ChangeEvent::Added(vec!["COM4".to_string()]), &current);

        assert_eq!(tray.ports(), vec!["COM1", "COM4"]);
        assert_eq!(tray.entries()[1].label, "COM4 (FT232R USB UART)");
        assert_eq!(tray.last_connected(), Some("COM4"));
        assert_eq!(
            notes,
            vec![Notification {
                title: "COM4 is added".to_string(),
                message: "Click to open terminal".to_string(),
            }]
        );

        let notes = tray.apply(&ChangeEvent::Removed(vec!["COM1".to_string()]), &current);
        assert_eq!(tray.ports(), vec!["COM4"]);
        assert_eq!(tray.last_connected(), None);
        assert_eq!(notes[0].title, "COM1 is removed");
        assert_eq!(notes[0].message, "Click to dismiss");
    }

    #[test]
    fn test_activate_notification() {
        let settings = Settings::default();
        let mut tray = TrayModel::new();
        assert!(tray.activate_notification(&settings).is_none());

        let current = snapshot(vec![DeviceDescriptor::new("COM7")]);
        tray.apply(&ChangeEvent::Added(vec!["COM7".to_string()]), &current);

        let command = tray.activate_notification(&settings).unwrap().unwrap();
        assert_eq!(command.program, "putty");
        assert!(command.args.contains(&"COM7".to_string()));
    }

    #[test]
    fn test_subscriber_updates_tray() {
        let enumerator = ScriptedEnumerator::new()
            .then_ports(["COM1"])
            .then_ports(["COM1", "COM2"]);
        let watcher = Arc::new(PortWatcher::new(enumerator.clone()));
        let tray = Arc::new(Mutex::new(TrayModel::new()));
        watcher.subscribe(subscriber(
            Arc::clone(&tray),
            Arc::downgrade(&watcher),
            Arc::new(Settings::default()),
        ));

        watcher.start(std::time::Duration::from_secs(3600)).unwrap();
        tray.lock().unwrap().seed(&watcher.current_snapshot());
        assert!(enumerator.wait_for_calls(2, std::time::Duration::from_secs(5)));
        watcher.stop(std::time::Duration::from_secs(5)).unwrap();

        let tray = tray.lock().unwrap();
        let mut ports = tray.ports();
        ports.sort();
        assert_eq!(ports, vec!["COM1", "COM2"]);
        assert_eq!(tray.last_connected(), Some("COM2"));
    }
}
