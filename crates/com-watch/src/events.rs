//! Port change events

use com_detect::SnapshotDiff;

/// A change observed between two consecutive polls
///
/// Each variant carries port identifiers in enumeration order. A tick
/// produces at most one event of each kind, `Added` before `Removed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Ports that appeared since the previous poll
    Added(Vec<String>),
    /// Ports that disappeared since the previous poll
    Removed(Vec<String>),
}

impl ChangeEvent {
    /// Port identifiers carried by this event
    pub fn ports(&self) -> &[String] {
        match self {
            ChangeEvent::Added(ports) | ChangeEvent::Removed(ports) => ports,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, ChangeEvent::Added(_))
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, ChangeEvent::Removed(_))
    }

    /// Split a diff into the events for one tick
    pub fn from_diff(diff: SnapshotDiff) -> Vec<ChangeEvent> {
        let mut events = Vec::with_capacity(2);
        if !diff.added.is_empty() {
            events.push(ChangeEvent::Added(diff.added));
        }
        if !diff.removed.is_empty() {
            events.push(ChangeEvent::Removed(diff.removed));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_diff_orders_added_before_removed() {
        let diff = SnapshotDiff {
            added: vec!["COM4".to_string()],
            removed: vec!["COM3".to_string()],
        };

        let events = ChangeEvent::from_diff(diff);
        assert_eq!(
            events,
            vec![
                ChangeEvent::Added(vec!["COM4".to_string()]),
                ChangeEvent::Removed(vec!["COM3".to_string()]),
            ]
        );
        assert!(events[0].is_added());
        assert!(events[1].is_removed());
    }

    #[test]
    fn test_from_diff_skips_empty_categories() {
        assert!(ChangeEvent::from_diff(SnapshotDiff::default()).is_empty());

        let diff = SnapshotDiff {
            added: vec![],
            removed: vec!["/dev/ttyACM0".to_string()],
        };
        let events = ChangeEvent::from_diff(diff);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ports(), ["/dev/ttyACM0".to_string()]);
    }
}
