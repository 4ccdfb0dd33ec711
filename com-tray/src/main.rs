//! COM Port Tray Application
//!
//! Watches the host's serial ports, keeps a menu of the attached ones and
//! notifies when a port appears or disappears. A terminal can be opened for
//! the most recently attached port.

mod launcher;
mod settings;
mod sim_task;
mod tray;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context};
use com_detect::{ScannerConfig, SerialEnumerator};
use com_sim::VirtualPorts;
use com_watch::PortWatcher;
use settings::Settings;
use sim_task::{run_sim_task, SimTaskCommand};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tray::TrayModel;

/// How long to wait for the polling thread at exit
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Period of the simulated hotplug port
const SIM_HOTPLUG_PERIOD: Duration = Duration::from_secs(5);

/// Handle to the simulated hotplug task
struct SimTask {
    cmd_tx: tokio_mpsc::Sender<SimTaskCommand>,
    handle: JoinHandle<()>,
}

impl SimTask {
    fn spawn(ports: VirtualPorts) -> Self {
        let (cmd_tx, cmd_rx) = tokio_mpsc::channel(1);
        let handle = tokio::spawn(run_sim_task(cmd_rx, ports, SIM_HOTPLUG_PERIOD));
        Self { cmd_tx, handle }
    }

    async fn shutdown(self) {
        let _ = self.cmd_tx.send(SimTaskCommand::Shutdown).await;
        if let Err(e) = self.handle.await {
            warn!("Simulated hotplug task failed: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "comtray=info,com_detect=info,com_watch=info,com_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting comtray");

    let settings = Settings::load();
    if let Some(path) = Settings::settings_path() {
        if !path.exists() {
            match settings.save() {
                Ok(()) => info!("Wrote default settings to {}", path.display()),
                Err(e) => warn!("Failed to write default settings: {}", e),
            }
        }
    }
    let settings = Arc::new(settings);

    let mut sim_task = None;
    let watcher = if settings.simulate {
        info!("Simulation mode: watching virtual ports");
        let ports = VirtualPorts::with_ports(settings.simulated_ports.clone());
        sim_task = Some(SimTask::spawn(ports.clone()));
        PortWatcher::new(ports)
    } else {
        PortWatcher::new(SerialEnumerator::with_config(ScannerConfig {
            skip_patterns: settings.skip_patterns.clone(),
        }))
    };
    let watcher = Arc::new(watcher);

    watcher.on_failure(|e| error!("Port detection stopped, restart comtray to resume: {}", e));

    let tray = Arc::new(Mutex::new(TrayModel::new()));
    watcher.subscribe(tray::subscriber(
        Arc::clone(&tray),
        Arc::downgrade(&watcher),
        Arc::clone(&settings),
    ));

    watcher
        .start(settings.poll_interval())
        .context("failed to start port watcher")?;

    {
        let mut tray = tray.lock().map_err(|_| anyhow!("tray state poisoned"))?;
        tray.seed(&watcher.current_snapshot());
        if tray.entries().is_empty() {
            info!("No serial ports available");
        }
        for entry in tray.entries() {
            info!("Port: {}", entry.label);
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");

    if let Some(task) = sim_task {
        task.shutdown().await;
    }

    let stopping = Arc::clone(&watcher);
    match tokio::task::spawn_blocking(move || stopping.stop(SHUTDOWN_TIMEOUT)).await? {
        Ok(()) => info!("Port watcher stopped"),
        Err(e) => warn!("Port watcher did not stop cleanly: {}", e),
    }

    Ok(())
}
