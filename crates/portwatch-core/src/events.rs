//! Change events handed to notification consumers.
//!
//! Each event carries one [`PortChange`] (one host, one direction) plus the
//! session that observed it. Consumers receive them as JSON lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DiffResult, PortChange};

/// Unique identifier for an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// A port exposure change observed by one scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: EventId,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub change: PortChange,
}

impl ChangeEvent {
    pub fn new(session_id: Uuid, change: PortChange) -> Self {
        Self {
            id: EventId::new(),
            session_id,
            timestamp: Utc::now(),
            change,
        }
    }

    /// Build one event per host per direction in `diff`.
    pub fn from_diff(session_id: Uuid, diff: &DiffResult) -> Vec<Self> {
        diff.changes()
            .map(|change| Self::new(session_id, change))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compute_diff;
    use crate::types::{Direction, HostPortSnapshot};

    #[test]
    fn test_event_serialization_is_flat() {
        let previous: HostPortSnapshot = [("10.0.0.1", vec![22, 80])].into_iter().collect();
        let current: HostPortSnapshot = [("10.0.0.1", vec![22, 443])].into_iter().collect();
        let diff = compute_diff(&previous, &current);

        let session_id = Uuid::nil();
        let events = ChangeEvent::from_diff(session_id, &diff);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].change.direction, Direction::Exposed);

        let json = serde_json::to_value(&events[1]).unwrap();
        assert_eq!(json["host"], "10.0.0.1");
        assert_eq!(json["direction"], "closed");
        assert_eq!(json["ports"], serde_json::json!([80]));
        assert_eq!(json["session_id"], session_id.to_string());
    }

    #[test]
    fn test_empty_diff_yields_no_events() {
        let snapshot: HostPortSnapshot = [("10.0.0.1", vec![22])].into_iter().collect();
        let diff = compute_diff(&snapshot, &snapshot);
        assert!(ChangeEvent::from_diff(Uuid::new_v4(), &diff).is_empty());
    }
}
