//! Scan artifacts and their decoding into open-port snapshots.
//!
//! An artifact is the raw nmap XML report of one scan. It is stored and
//! reloaded byte for byte; snapshots are never re-encoded into artifacts.

use std::collections::BTreeMap;

use portwatch_core::{HostAddress, HostPortSnapshot, PortSet};

use crate::error::ArtifactParseError;
use crate::nmap_xml::{self, NmapRun};

/// The raw bytes of one scan run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanArtifact(Vec<u8>);

impl ScanArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode this artifact into the ports it saw open.
    pub fn decode(&self) -> Result<HostPortSnapshot, ArtifactParseError> {
        decode(&self.0)
    }
}

/// Decode nmap XML bytes into a host → open ports snapshot.
///
/// Empty or non-nmap input is an error, never an empty snapshot.
pub fn decode(bytes: &[u8]) -> Result<HostPortSnapshot, ArtifactParseError> {
    let run = nmap_xml::parse_nmap_xml(bytes)?;
    Ok(snapshot_from_run(&run))
}

/// Reduce a parsed run to its open ports.
///
/// Hosts without an address or without any port entries are skipped, and a
/// host is keyed by the first address nmap listed for it. Only ports whose
/// state is exactly `open` are kept. Hosts that share a key are merged.
pub fn snapshot_from_run(run: &NmapRun) -> HostPortSnapshot {
    let mut hosts: BTreeMap<HostAddress, PortSet> = BTreeMap::new();

    for host in &run.hosts {
        let Some(addr) = host.primary_address() else {
            continue;
        };
        let entries = host.port_entries();
        if entries.is_empty() {
            continue;
        }

        let open = entries.iter().filter(|p| p.is_open()).map(|p| p.port_id);
        hosts.entry(HostAddress::from(addr)).or_default().extend(open);
    }

    hosts.into_iter().collect()
}
