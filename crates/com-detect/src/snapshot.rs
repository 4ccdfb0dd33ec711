//! Point-in-time device snapshots and snapshot diffing

use std::collections::HashSet;

use crate::device::DeviceDescriptor;

/// All ports visible at one point in time
///
/// Unique by identifier. Enumeration order is preserved so diffs can be
/// reported in the order the OS listed the ports.
#[derive(Debug, Clone, Default)]
pub struct DeviceSnapshot {
    devices: Vec<DeviceDescriptor>,
    ids: HashSet<String>,
}

impl DeviceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices in the snapshot
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&DeviceDescriptor> {
        if !self.contains(id) {
            return None;
        }
        self.devices.iter().find(|d| d.id() == id)
    }

    /// Devices in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter()
    }

    /// Port identifiers in enumeration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(DeviceDescriptor::id)
    }

    /// Insert a device, returning false if its identifier is already present
    fn insert(&mut self, device: DeviceDescriptor) -> bool {
        if self.ids.insert(device.id().to_string()) {
            self.devices.push(device);
            true
        } else {
            false
        }
    }

    /// Compute what changed going from `previous` to `self`
    ///
    /// Added ids follow this snapshot's order, removed ids follow the order
    /// of `previous`.
    pub fn diff(&self, previous: &DeviceSnapshot) -> SnapshotDiff {
        let added = self
            .ids()
            .filter(|id| !previous.contains(id))
            .map(str::to_string)
            .collect();
        let removed = previous
            .ids()
            .filter(|id| !self.contains(id))
            .map(str::to_string)
            .collect();
        SnapshotDiff { added, removed }
    }
}

impl FromIterator<DeviceDescriptor> for DeviceSnapshot {
    /// Duplicate identifiers are dropped; the first occurrence wins.
    fn from_iter<I: IntoIterator<Item = DeviceDescriptor>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for device in iter {
            snapshot.insert(device);
        }
        snapshot
    }
}

impl<'a> FromIterator<&'a str> for DeviceSnapshot {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(DeviceDescriptor::new).collect()
    }
}

impl IntoIterator for DeviceSnapshot {
    type Item = DeviceDescriptor;
    type IntoIter = std::vec::IntoIter<DeviceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

/// Difference between two consecutive snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Ports present now but not before
    pub added: Vec<String>,
    /// Ports present before but not now
    pub removed: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Apply this diff to a set of port identifiers
    pub fn apply(&self, ids: &mut HashSet<String>) {
        for id in &self.removed {
            ids.remove(id);
        }
        ids.extend(self.added.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id_set(snapshot: &DeviceSnapshot) -> HashSet<String> {
        snapshot.ids().map(str::to_string).collect()
    }

    #[test]
    fn test_duplicates_dropped_first_wins() {
        let snapshot: DeviceSnapshot = vec![
            DeviceDescriptor::new("COM1").with_description("first"),
            DeviceDescriptor::new("COM2"),
            DeviceDescriptor::new("COM1").with_description("second"),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("COM1").unwrap().description(), Some("first"));
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec!["COM1", "COM2"]);
    }

    #[test]
    fn test_diff_preserves_enumeration_order() {
        let previous: DeviceSnapshot = ["COM4", "COM1", "COM3"].into_iter().collect();
        let current: DeviceSnapshot = ["COM9", "COM1", "COM5"].into_iter().collect();

        let diff = current.diff(&previous);
        assert_eq!(diff.added, vec!["COM9", "COM5"]);
        assert_eq!(diff.removed, vec!["COM4", "COM3"]);
    }

    #[test]
    fn test_diff_ignores_description_changes() {
        let previous: DeviceSnapshot = vec![DeviceDescriptor::new("COM3").with_description("a")]
            .into_iter()
            .collect();
        let current: DeviceSnapshot = vec![DeviceDescriptor::new("COM3").with_description("b")]
            .into_iter()
            .collect();

        assert!(current.diff(&previous).is_empty());
    }

    fn port_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec((0u8..12).prop_map(|n| format!("COM{}", n)), 0..10)
    }

    proptest! {
        #[test]
        fn diff_reconstructs_current(before in port_names(), after in port_names()) {
            let previous: DeviceSnapshot = before.iter().map(String::as_str).collect();
            let current: DeviceSnapshot = after.iter().map(String::as_str).collect();

            let diff = current.diff(&previous);
            let mut ids = id_set(&previous);
            diff.apply(&mut ids);
            prop_assert_eq!(ids, id_set(&current));

            for id in &diff.added {
                prop_assert!(!diff.removed.contains(id));
            }
        }
    }
}
