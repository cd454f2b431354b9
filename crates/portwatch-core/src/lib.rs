//! portwatch-core: Shared types for the portwatch exposure monitor.
//!
//! This crate provides the value types passed between pipeline stages:
//! - Host addresses and per-host open-port snapshots
//! - Exposure diffs between two snapshots
//! - Change events handed to notification consumers

pub mod diff;
pub mod events;
pub mod types;

pub use diff::compute_diff;
pub use events::{ChangeEvent, EventId};
pub use types::{
    Direction, DiffResult, DiffSummary, HostAddress, HostPortSnapshot, PortChange, PortNumber,
    PortSet,
};
