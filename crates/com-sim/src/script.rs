//! Scripted enumeration
//!
//! Replays a fixed list of steps, one per `enumerate` call. Once the script
//! is exhausted the last step repeats forever.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use com_detect::{DetectError, DeviceEnumerator, DeviceSnapshot};

#[derive(Debug, Clone)]
enum Step {
    Ports(DeviceSnapshot),
    Fail(String),
    Panic(String),
}

/// Enumerator that replays a script of snapshots
///
/// Clones share the call counter, so a test can keep a clone after handing
/// the enumerator to a watcher.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEnumerator {
    steps: Arc<Vec<Step>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEnumerator {
    /// Create an empty script (always enumerates no ports)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a script from a list of port-name snapshots
    pub fn from_snapshots<I, S>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        snapshots
            .into_iter()
            .fold(Self::new(), |script, ports| script.then_ports(ports))
    }

    /// Append a step that returns these ports
    pub fn then_ports<I>(self, ports: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let names: Vec<String> = ports.into_iter().map(|p| p.as_ref().to_string()).collect();
        self.then_snapshot(names.iter().map(String::as_str).collect())
    }

    /// Append a step that returns this snapshot
    pub fn then_snapshot(self, snapshot: DeviceSnapshot) -> Self {
        self.push(Step::Ports(snapshot))
    }

    /// Append a step that fails enumeration
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.push(Step::Fail(reason.into()))
    }

    /// Append a step that panics inside `enumerate`
    pub fn then_panic(self, message: impl Into<String>) -> Self {
        self.push(Step::Panic(message.into()))
    }

    fn push(self, step: Step) -> Self {
        let mut steps = Arc::unwrap_or_clone(self.steps);
        steps.push(step);
        Self {
            steps: Arc::new(steps),
            calls: self.calls,
        }
    }

    /// Number of `enumerate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Block until at least `count` calls were made or `timeout` elapses
    pub fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.calls() < count {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl DeviceEnumerator for ScriptedEnumerator {
    fn enumerate(&self) -> Result<DeviceSnapshot, DetectError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(last) = self.steps.len().checked_sub(1) else {
            return Ok(DeviceSnapshot::new());
        };

        match &self.steps[call.min(last)] {
            Step::Ports(snapshot) => Ok(snapshot.clone()),
            Step::Fail(reason) => Err(DetectError::EnumerationFailed(reason.clone())),
            Step::Panic(message) => panic!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(enumerator: &ScriptedEnumerator) -> Vec<String> {
        enumerator
            .enumerate()
            .unwrap()
            .ids()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_replays_then_repeats_last() {
        let script = ScriptedEnumerator::from_snapshots([vec!["COM1"], vec!["COM1", "COM2"]]);

        assert_eq!(ids(&script), vec!["COM1"]);
        assert_eq!(ids(&script), vec!["COM1", "COM2"]);
        assert_eq!(ids(&script), vec!["COM1", "COM2"]);
        assert_eq!(script.calls(), 3);
    }

    #[test]
    fn test_failure_step() {
        let script = ScriptedEnumerator::new()
            .then_fail("access denied")
            .then_ports(["COM3"]);

        assert!(matches!(
            script.enumerate(),
            Err(DetectError::EnumerationFailed(reason)) if reason == "access denied"
        ));
        assert_eq!(ids(&script), vec!["COM3"]);
    }

    #[test]
    fn test_clones_share_counter() {
        let script = ScriptedEnumerator::new();
        let handle = script.clone();

        script.enumerate().unwrap();
        assert_eq!(handle.calls(), 1);
        assert!(handle.wait_for_calls(1, Duration::ZERO));
        assert!(!handle.wait_for_calls(2, Duration::from_millis(5)));
    }
}
