//! Error types for the portwatch-scan crate.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = WatchError> = std::result::Result<T, E>;

/// The scan artifact bytes could not be decoded into a snapshot.
#[derive(Error, Debug)]
pub enum ArtifactParseError {
    #[error("Scan artifact is empty")]
    Empty,

    #[error("Scan artifact has no root element")]
    MissingRoot,

    #[error("Expected <nmaprun> root element, found <{found}>")]
    UnexpectedRoot { found: String },

    #[error("Failed to parse nmap XML output: {0}")]
    Xml(String),
}

/// The probe could not produce a usable artifact.
#[derive(Error, Debug)]
pub enum ScanExecutionError {
    #[error("No scan targets given")]
    NoTargets,

    #[error("Nmap not found at path {path}: {reason}")]
    NmapNotFound { path: String, reason: String },

    #[error("Nmap exited with code {code}: {stderr}")]
    NmapFailed { code: i32, stderr: String },

    #[error("Nmap aborted the scan: {message}")]
    Aborted { message: String },

    #[error("Scan exceeded its {budget:?} budget")]
    Timeout { budget: Duration },

    #[error("Nmap produced an unreadable report: {0}")]
    InvalidOutput(#[from] ArtifactParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The storage collaborator failed to read or write an artifact.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("No stored artifact at {location}")]
    NotFound { location: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure inside the scan pipeline.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    Parse(#[from] ArtifactParseError),

    #[error(transparent)]
    Scan(#[from] ScanExecutionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Pipeline stage at which a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Scan,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Scan => f.write_str("scan"),
            Self::Persist => f.write_str("persist"),
        }
    }
}

/// A session failure tagged with the stage it happened in.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct SessionError {
    pub stage: Stage,
    #[source]
    pub source: WatchError,
}

impl SessionError {
    pub fn new(stage: Stage, source: impl Into<WatchError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}
