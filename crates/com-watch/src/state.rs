//! Watcher lifecycle state

use std::fmt;

/// Lifecycle of a [`PortWatcher`](crate::PortWatcher)
///
/// `Stopped --start--> Running --stop--> StopRequested --thread exits--> Stopped`
///
/// There is no separate crashed state: a loop that dies unexpectedly reports
/// the failure and returns to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Stopped,
    Running,
    StopRequested,
}

impl LifecycleState {
    /// True while a polling thread exists
    pub fn is_active(&self) -> bool {
        !matches!(self, LifecycleState::Stopped)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Running => "running",
            LifecycleState::StopRequested => "stopping",
        };
        f.write_str(name)
    }
}
