//! portwatch-scan: Port exposure monitoring built on nmap.
//!
//! Loads the previous scan artifact, runs a bounded nmap scan, diffs the
//! open ports of both runs, and stores the new artifact for next time.

pub mod codec;
pub mod config;
pub mod error;
pub mod nmap_xml;
pub mod scanner;
pub mod session;
pub mod store;

pub use codec::{decode, ScanArtifact};
pub use error::{ArtifactParseError, PersistenceError, ScanExecutionError, SessionError, Stage};
pub use scanner::{NmapExecutor, ProbeMode, ScanExecutor, ScanOutput};
pub use session::{ScanSession, SessionOutcome};
pub use store::{ArtifactStore, FileArtifactStore};
