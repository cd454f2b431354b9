//! Nmap process wrapper.
//!
//! Executes nmap as a child process via `tokio::process::Command`, bounded
//! by a deadline, and returns the raw XML report together with any warnings
//! nmap printed on stderr.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use portwatch_core::HostAddress;
use tokio::process::Command;

use crate::codec::ScanArtifact;
use crate::error::ScanExecutionError;
use crate::nmap_xml;

/// Default scan budget: five hours.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5 * 60 * 60);

/// What one successful probing pass produced.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// The raw run report, kept verbatim for persistence.
    pub artifact: ScanArtifact,
    /// Non-fatal diagnostics (unreachable hosts, missing privileges, ...).
    pub warnings: Vec<String>,
    /// Wall-clock duration of the probe.
    pub duration: Duration,
}

/// Runs one probing pass over a list of targets.
#[async_trait]
pub trait ScanExecutor: Send + Sync {
    /// Probe `targets` once, in order, giving up after `timeout`.
    ///
    /// On failure or timeout nothing partial is returned.
    async fn execute(
        &self,
        targets: &[HostAddress],
        timeout: Duration,
    ) -> Result<ScanOutput, ScanExecutionError>;
}

/// How nmap picks the network path for its probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProbeMode {
    /// Let nmap choose the interface from the routing table.
    #[default]
    Default,
    /// Send all probes through one named interface (`-e`).
    BoundInterface { interface: String },
}

impl ProbeMode {
    pub fn from_interface(interface: Option<&str>) -> Self {
        match interface.map(str::trim) {
            Some(name) if !name.is_empty() => Self::BoundInterface {
                interface: name.to_string(),
            },
            _ => Self::Default,
        }
    }

    /// Return the nmap flags for this mode.
    pub fn nmap_flags(&self) -> Vec<&str> {
        match self {
            Self::Default => vec![],
            Self::BoundInterface { interface } => vec!["-e", interface.as_str()],
        }
    }
}

/// Wrapper around the nmap binary.
pub struct NmapExecutor {
    nmap_path: String,
    mode: ProbeMode,
}

impl NmapExecutor {
    pub fn new(nmap_path: &str, mode: ProbeMode) -> Self {
        Self {
            nmap_path: nmap_path.to_string(),
            mode,
        }
    }

    pub fn mode(&self) -> &ProbeMode {
        &self.mode
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String, ScanExecutionError> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ScanExecutionError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn command(&self, targets: &[HostAddress]) -> Command {
        let mut cmd = Command::new(&self.nmap_path);
        cmd.args(self.mode.nmap_flags())
            .arg("-oX")
            .arg("-")
            .arg("--noninteractive")
            .arg("-Pn")
            .args(targets.iter().map(HostAddress::as_str))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> ScanExecutionError {
        match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => ScanExecutionError::NmapNotFound {
                path: self.nmap_path.clone(),
                reason: e.to_string(),
            },
            _ => ScanExecutionError::Io(e),
        }
    }
}

#[async_trait]
impl ScanExecutor for NmapExecutor {
    /// Nmap is invoked with `-oX -` to write XML to stdout and `-Pn` to skip
    /// host discovery. The child is killed if the deadline elapses.
    async fn execute(
        &self,
        targets: &[HostAddress],
        timeout: Duration,
    ) -> Result<ScanOutput, ScanExecutionError> {
        if targets.is_empty() {
            return Err(ScanExecutionError::NoTargets);
        }

        let start = Instant::now();
        tracing::info!(
            targets = targets.len(),
            mode = ?self.mode,
            timeout_secs = timeout.as_secs(),
            "Starting nmap scan"
        );

        // Dropping the output future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, self.command(targets).output()).await {
            Ok(result) => result.map_err(|e| self.spawn_error(e))?,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Nmap scan exceeded its budget, process killed"
                );
                return Err(ScanExecutionError::Timeout { budget: timeout });
            }
        };

        let duration = start.elapsed();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ScanExecutionError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        let warnings = collect_warnings(&stderr);
        for warning in &warnings {
            tracing::warn!(warning = %warning, "Nmap warning");
        }

        let run = nmap_xml::parse_nmap_xml(&output.stdout)?;
        if let Some(message) = run.error_message() {
            return Err(ScanExecutionError::Aborted {
                message: message.to_string(),
            });
        }

        tracing::info!(
            hosts = run.hosts.len(),
            hosts_up = run.hosts.iter().filter(|h| h.is_up()).count(),
            warnings = warnings.len(),
            duration_ms = duration.as_millis(),
            "Nmap scan complete"
        );

        Ok(ScanOutput {
            artifact: ScanArtifact::new(output.stdout),
            warnings,
            duration,
        })
    }
}

/// Each non-blank stderr line is one warning.
fn collect_warnings(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
