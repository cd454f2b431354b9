//! Configuration for the portwatch scanner.

use std::time::Duration;

use serde::Deserialize;

use crate::scanner::{ProbeMode, DEFAULT_SCAN_TIMEOUT};

/// Top-level watch configuration.
///
/// Loaded from the `[watch]` section of `portwatch.toml` or
/// `PORTWATCH_WATCH__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Upper bound on one scan, in seconds.
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    /// Network interface to bind probes to. Unset lets nmap choose.
    #[serde(default)]
    pub interface: Option<String>,

    /// File holding the artifact of the last completed scan.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,

    /// Hosts to scan, in order.
    #[serde(default)]
    pub targets: Vec<String>,
}

impl WatchConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn probe_mode(&self) -> ProbeMode {
        ProbeMode::from_interface(self.interface.as_deref())
    }
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_scan_timeout_secs() -> u64 {
    DEFAULT_SCAN_TIMEOUT.as_secs()
}

fn default_artifact_path() -> String {
    "./previous-scan.xml".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            scan_timeout_secs: default_scan_timeout_secs(),
            interface: None,
            artifact_path: default_artifact_path(),
            targets: Vec::new(),
        }
    }
}

/// Load the `[watch]` section from `<file_prefix>.toml` and the environment.
///
/// A missing file or section falls back to defaults.
pub fn load_watch_config(file_prefix: &str) -> Result<WatchConfig, config::ConfigError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("PORTWATCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("watch.targets")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<WatchConfig>("watch") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(WatchConfig::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.nmap_path, "nmap");
        assert_eq!(config.scan_timeout(), Duration::from_secs(5 * 60 * 60));
        assert_eq!(config.probe_mode(), ProbeMode::Default);
        assert_eq!(config.artifact_path, "./previous-scan.xml");
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_interface_selects_bound_mode() {
        let config = WatchConfig {
            interface: Some("eth1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.probe_mode(),
            ProbeMode::BoundInterface {
                interface: "eth1".to_string()
            }
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.toml");
        std::fs::write(
            &path,
            r#"
[watch]
nmap_path = "/usr/local/bin/nmap"
scan_timeout_secs = 600
targets = ["10.0.0.1", "bastion.example.com"]
"#,
        )
        .unwrap();

        let prefix = dir.path().join("watch");
        let config = load_watch_config(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.nmap_path, "/usr/local/bin/nmap");
        assert_eq!(config.scan_timeout(), Duration::from_secs(600));
        assert_eq!(config.targets, vec!["10.0.0.1", "bastion.example.com"]);
        assert_eq!(config.artifact_path, "./previous-scan.xml");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("absent");
        let config = load_watch_config(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.nmap_path, "nmap");
    }
}
