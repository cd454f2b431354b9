//! Exposure diffing between two host/port snapshots.

use std::collections::BTreeMap;

use crate::types::{DiffResult, HostAddress, HostPortSnapshot, PortSet};

/// Compute which ports were exposed and which were closed between
/// `previous` and `current`.
///
/// Both directions are always computed. Hosts that end up with no ports in
/// a direction are left out of that direction entirely.
pub fn compute_diff(previous: &HostPortSnapshot, current: &HostPortSnapshot) -> DiffResult {
    let mut exposed: BTreeMap<HostAddress, PortSet> = BTreeMap::new();
    let mut closed: BTreeMap<HostAddress, PortSet> = BTreeMap::new();

    for (host, current_ports) in current {
        match previous.ports(host) {
            None => insert_non_empty(&mut exposed, host, current_ports.clone()),
            Some(previous_ports) => {
                let added: PortSet = current_ports.difference(previous_ports).copied().collect();
                let removed: PortSet = previous_ports.difference(current_ports).copied().collect();
                insert_non_empty(&mut exposed, host, added);
                insert_non_empty(&mut closed, host, removed);
            }
        }
    }

    for (host, previous_ports) in previous {
        if !current.contains_host(host) {
            insert_non_empty(&mut closed, host, previous_ports.clone());
        }
    }

    DiffResult {
        exposed: exposed.into_iter().collect(),
        closed: closed.into_iter().collect(),
    }
}

fn insert_non_empty(map: &mut BTreeMap<HostAddress, PortSet>, host: &HostAddress, ports: PortSet) {
    if !ports.is_empty() {
        map.insert(host.clone(), ports);
    }
}
