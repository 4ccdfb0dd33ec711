//! Simulated Hotplug Task
//!
//! Periodically attaches and detaches a virtual port so the watcher and the
//! tray model can be exercised without hardware.

use std::time::Duration;

use com_sim::{VirtualPortConfig, VirtualPorts};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, info};

/// Name of the port toggled by the task
pub const HOTPLUG_PORT: &str = "SIM-HOTPLUG";

/// Commands that can be sent to the hotplug task
#[derive(Debug)]
pub enum SimTaskCommand {
    /// Shutdown the task
    Shutdown,
}

/// Run the simulated hotplug task
///
/// Toggles [`HOTPLUG_PORT`] every `period` until told to shut down or the
/// command channel closes. The port is left detached on exit.
pub async fn run_sim_task(
    mut cmd_rx: tokio_mpsc::Receiver<SimTaskCommand>,
    ports: VirtualPorts,
    period: Duration,
) {
    info!("Simulated hotplug task starting ({:?} period)", period);

    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SimTaskCommand::Shutdown) | None => break,
                }
            }

            _ = ticker.tick() => {
                if ports.is_attached(HOTPLUG_PORT) {
                    ports.detach(HOTPLUG_PORT);
                    debug!("Detached {}", HOTPLUG_PORT);
                } else {
                    let port = VirtualPortConfig {
                        vid: Some(0x0403),
                        pid: Some(0x6001),
                        ..VirtualPortConfig::new(HOTPLUG_PORT)
                    };
                    ports.attach(port);
                    debug!("Attached {}", HOTPLUG_PORT);
                }
            }
        }
    }

    ports.detach(HOTPLUG_PORT);
    info!("Simulated hotplug task shutting down");
}
