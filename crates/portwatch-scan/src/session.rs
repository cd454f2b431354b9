//! One load → scan → diff → persist cycle.
//!
//! Each stage hands its result to the next as a value; nothing is stored on
//! the session between stages. A failure ends the session immediately and
//! is tagged with the stage it happened in.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use portwatch_core::{compute_diff, DiffResult, HostAddress, HostPortSnapshot};
use uuid::Uuid;

use crate::codec;
use crate::error::{Result, ScanExecutionError, SessionError, Stage, WatchError};
use crate::scanner::{ScanExecutor, ScanOutput};
use crate::store::ArtifactStore;

/// Where a session is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loaded,
    Scanned,
    Diffed,
    Persisted,
    Done,
    Failed(Stage),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loaded => f.write_str("loaded"),
            Self::Scanned => f.write_str("scanned"),
            Self::Diffed => f.write_str("diffed"),
            Self::Persisted => f.write_str("persisted"),
            Self::Done => f.write_str("done"),
            Self::Failed(stage) => write!(f, "failed({stage})"),
        }
    }
}

/// Result of a completed session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub diff: DiffResult,
    /// Hosts in the previous snapshot.
    pub previous_hosts: usize,
    /// Hosts in the current snapshot.
    pub current_hosts: usize,
    pub warnings: Vec<String>,
    pub scan_duration: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Result of seeding an empty store.
#[derive(Debug, Clone)]
pub struct SeedOutcome {
    pub session_id: Uuid,
    pub hosts: usize,
    pub warnings: Vec<String>,
    pub scan_duration: Duration,
}

/// A single scan session against one executor and one artifact store.
pub struct ScanSession<E, S> {
    id: Uuid,
    executor: E,
    store: S,
    timeout: Duration,
}

impl<E: ScanExecutor, S: ArtifactStore> ScanSession<E, S> {
    pub fn new(executor: E, store: S, timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            executor,
            store,
            timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the full pipeline and return the exposure diff.
    ///
    /// If storing the current artifact fails, the diff is withheld and the
    /// stored previous artifact stays in place, so the next session reports
    /// the same changes again.
    pub async fn run(self, targets: &[HostAddress]) -> Result<SessionOutcome, SessionError> {
        let started_at = Utc::now();
        self.enter(SessionState::Idle);

        let previous = self.load().await.map_err(|e| self.fail(Stage::Load, e))?;
        self.enter(SessionState::Loaded);
        tracing::info!(session_id = %self.id, hosts = previous.len(), "Previous scan loaded");

        let (output, current) = self
            .scan(targets)
            .await
            .map_err(|e| self.fail(Stage::Scan, e))?;
        self.enter(SessionState::Scanned);

        let diff = compute_diff(&previous, &current);
        self.enter(SessionState::Diffed);
        let summary = diff.summary();
        tracing::info!(
            session_id = %self.id,
            exposed_hosts = summary.exposed_hosts,
            exposed_ports = summary.exposed_ports,
            closed_hosts = summary.closed_hosts,
            closed_ports = summary.closed_ports,
            "Scans diffed"
        );

        self.store
            .put(output.artifact.as_bytes())
            .await
            .map_err(|e| self.fail(Stage::Persist, e))?;
        self.enter(SessionState::Persisted);

        self.enter(SessionState::Done);
        Ok(SessionOutcome {
            session_id: self.id,
            diff,
            previous_hosts: previous.len(),
            current_hosts: current.len(),
            warnings: output.warnings,
            scan_duration: output.duration,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Scan and store the artifact without diffing, for a store that has no
    /// previous artifact yet.
    pub async fn seed(self, targets: &[HostAddress]) -> Result<SeedOutcome, SessionError> {
        self.enter(SessionState::Idle);

        let (output, current) = self
            .scan(targets)
            .await
            .map_err(|e| self.fail(Stage::Scan, e))?;
        self.enter(SessionState::Scanned);

        self.store
            .put(output.artifact.as_bytes())
            .await
            .map_err(|e| self.fail(Stage::Persist, e))?;
        self.enter(SessionState::Persisted);

        self.enter(SessionState::Done);
        Ok(SeedOutcome {
            session_id: self.id,
            hosts: current.len(),
            warnings: output.warnings,
            scan_duration: output.duration,
        })
    }

    async fn load(&self) -> Result<HostPortSnapshot> {
        let bytes = self.store.get().await?;
        Ok(codec::decode(&bytes)?)
    }

    async fn scan(
        &self,
        targets: &[HostAddress],
    ) -> Result<(ScanOutput, HostPortSnapshot)> {
        // The deadline is owned here, whatever the executor does with its budget.
        let output =
            match tokio::time::timeout(self.timeout, self.executor.execute(targets, self.timeout))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ScanExecutionError::Timeout {
                        budget: self.timeout,
                    }
                    .into())
                }
            };
        let current = output.artifact.decode()?;
        tracing::info!(
            session_id = %self.id,
            hosts = current.len(),
            open_ports = current.port_count(),
            warnings = output.warnings.len(),
            "Current scan decoded"
        );
        Ok((output, current))
    }

    fn enter(&self, state: SessionState) {
        tracing::debug!(session_id = %self.id, state = %state, "Session state");
    }

    fn fail(&self, stage: Stage, source: impl Into<WatchError>) -> SessionError {
        let source = source.into();
        self.enter(SessionState::Failed(stage));
        tracing::error!(session_id = %self.id, stage = %stage, error = %source, "Session failed");
        SessionError::new(stage, source)
    }
}
