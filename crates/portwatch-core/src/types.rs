//! Core value types for port exposure tracking.
//!
//! Snapshots and diffs are plain values: built once, then only read.
//! Ordered collections keep iteration and serialized output deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Hosts & Ports ─────────────────────────────────────────────────

/// A TCP/UDP port number. Every value, including 0, is an ordinary port.
pub type PortNumber = u16;

/// A set of ports on one host.
pub type PortSet = BTreeSet<PortNumber>;

/// An IP address or hostname identifying one scanned host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct HostAddress(pub String);

impl HostAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HostAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for HostAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Ports observed open on each host at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HostPortSnapshot(BTreeMap<HostAddress, PortSet>);

impl HostPortSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open ports recorded for `host`, if the host is part of the snapshot.
    pub fn ports(&self, host: &HostAddress) -> Option<&PortSet> {
        self.0.get(host)
    }

    pub fn contains_host(&self, host: &HostAddress) -> bool {
        self.0.contains_key(host)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostAddress> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HostAddress, &PortSet)> {
        self.0.iter()
    }

    /// Number of hosts in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of (host, port) pairs.
    pub fn port_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }
}

/// Collects `(host, ports)` pairs. Repeated hosts have their ports merged.
impl<H, P> FromIterator<(H, P)> for HostPortSnapshot
where
    H: Into<HostAddress>,
    P: IntoIterator<Item = PortNumber>,
{
    fn from_iter<I: IntoIterator<Item = (H, P)>>(iter: I) -> Self {
        let mut hosts: BTreeMap<HostAddress, PortSet> = BTreeMap::new();
        for (host, ports) in iter {
            hosts.entry(host.into()).or_default().extend(ports);
        }
        Self(hosts)
    }
}

impl<'a> IntoIterator for &'a HostPortSnapshot {
    type Item = (&'a HostAddress, &'a PortSet);
    type IntoIter = std::collections::btree_map::Iter<'a, HostAddress, PortSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ── Diff ──────────────────────────────────────────────────────────

/// Which way a port moved between two snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Not open before, open now.
    Exposed,
    /// Open before, not open now.
    Closed,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exposed => f.write_str("exposed"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Exposure changes between a previous and a current snapshot.
///
/// Neither map ever holds a host with an empty port set. Values are only
/// produced by [`crate::diff::compute_diff`].
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DiffResult {
    pub(crate) exposed: HostPortSnapshot,
    pub(crate) closed: HostPortSnapshot,
}

impl DiffResult {
    /// Ports that became open, per host.
    pub fn exposed(&self) -> &HostPortSnapshot {
        &self.exposed
    }

    /// Ports that stopped being open, per host.
    pub fn closed(&self) -> &HostPortSnapshot {
        &self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.exposed.is_empty() && self.closed.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            exposed_hosts: self.exposed.len(),
            exposed_ports: self.exposed.port_count(),
            closed_hosts: self.closed.len(),
            closed_ports: self.closed.port_count(),
        }
    }

    /// One entry per host per direction, exposed entries first.
    pub fn changes(&self) -> impl Iterator<Item = PortChange> + '_ {
        let exposed = self
            .exposed
            .iter()
            .map(|(host, ports)| PortChange::new(host, Direction::Exposed, ports));
        let closed = self
            .closed
            .iter()
            .map(|(host, ports)| PortChange::new(host, Direction::Closed, ports));
        exposed.chain(closed)
    }
}

/// Counts describing a [`DiffResult`].
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct DiffSummary {
    pub exposed_hosts: usize,
    pub exposed_ports: usize,
    pub closed_hosts: usize,
    pub closed_ports: usize,
}

/// All ports of one host that moved in one direction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortChange {
    pub host: HostAddress,
    pub direction: Direction,
    pub ports: PortSet,
}

impl PortChange {
    fn new(host: &HostAddress, direction: Direction, ports: &PortSet) -> Self {
        Self {
            host: host.clone(),
            direction,
            ports: ports.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_merges_repeated_hosts() {
        let snapshot: HostPortSnapshot = [("10.0.0.1", vec![22]), ("10.0.0.1", vec![80, 22])]
            .into_iter()
            .collect();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.ports(&"10.0.0.1".into()),
            Some(&PortSet::from([22, 80]))
        );
        assert_eq!(snapshot.port_count(), 2);
    }

    #[test]
    fn test_snapshot_keeps_port_zero() {
        let snapshot: HostPortSnapshot = [("10.0.0.9", vec![0])].into_iter().collect();
        assert_eq!(snapshot.ports(&"10.0.0.9".into()), Some(&PortSet::from([0])));
    }

    #[test]
    fn test_snapshot_serializes_as_map() {
        let snapshot: HostPortSnapshot = [("web.internal", vec![443, 80])].into_iter().collect();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"web.internal":[80,443]}"#);
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(
            serde_json::to_string(&Direction::Exposed).unwrap(),
            r#""exposed""#
        );
        assert_eq!(Direction::Closed.to_string(), "closed");
    }
}
