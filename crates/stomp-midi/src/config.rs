//! Session configuration schema and loader
//!
//! Configuration is stored as YAML in the platform config directory.
//! Default location: ~/.config/magicstomp/stomp.yaml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StompConfig {
    /// Port name substring to match (case-insensitive)
    /// When unset, the device is auto-detected by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_match: Option<String>,

    /// Minimum spacing between queued parameter writes
    pub min_send_interval_ms: u64,

    /// How long `stop()` waits for the dispatcher thread before detaching it
    pub worker_join_timeout_ms: u64,

    /// Capacity of the dispatcher queue
    pub queue_capacity: usize,

    /// Default timeout for patch dump requests
    pub dump_timeout_ms: u64,

    /// Sleep between polls while collecting a patch dump
    pub poll_interval_ms: u64,

    /// Wait for the end-of-dump acknowledgement before completing a dump
    pub require_ack: bool,

    /// Parameter inventory YAML (built-in table when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_path: Option<PathBuf>,
}

impl Default for StompConfig {
    fn default() -> Self {
        Self {
            port_match: None,
            min_send_interval_ms: 10,
            worker_join_timeout_ms: 1000,
            queue_capacity: 1024,
            dump_timeout_ms: 2000,
            poll_interval_ms: 10,
            require_ack: true,
            inventory_path: None,
        }
    }
}

impl StompConfig {
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }

    pub fn worker_join_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_join_timeout_ms)
    }

    pub fn dump_timeout(&self) -> Duration {
        Duration::from_millis(self.dump_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Get the default config file path
///
/// Returns: <config dir>/magicstomp/stomp.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("magicstomp")
        .join("stomp.yaml")
}

/// Read session configuration from a YAML file, failing on any read or parse error
pub fn read_stomp_config(path: &Path) -> anyhow::Result<StompConfig> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Load session configuration from a YAML file
///
/// If the file doesn't exist, returns the default config.
/// If the file exists but is invalid, logs a warning and returns the default config.
pub fn load_stomp_config(path: &Path) -> StompConfig {
    log::info!("load_stomp_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_stomp_config: Config file doesn't exist, using defaults");
        return StompConfig::default();
    }

    match read_stomp_config(path) {
        Ok(config) => {
            log::info!(
                "load_stomp_config: port_match={:?}, send interval {}ms, queue {}",
                config.port_match,
                config.min_send_interval_ms,
                config.queue_capacity
            );
            config
        }
        Err(e) => {
            log::warn!("load_stomp_config: {:#}", e);
            StompConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StompConfig::default();
        assert_eq!(config.port_match, None);
        assert_eq!(config.min_send_interval(), Duration::from_millis(10));
        assert_eq!(config.worker_join_timeout(), Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 1024);
        assert!(config.require_ack);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
port_match: "UB9"
min_send_interval_ms: 20
require_ack: false
inventory_path: /tmp/inventory.yaml
"#;
        let config: StompConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port_match.as_deref(), Some("UB9"));
        assert_eq!(config.min_send_interval_ms, 20);
        assert!(!config.require_ack);
        assert_eq!(config.inventory_path, Some(PathBuf::from("/tmp/inventory.yaml")));
        // Unspecified fields keep their defaults
        assert_eq!(config.dump_timeout_ms, 2000);
        assert_eq!(config.queue_capacity, 1024);
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let config = StompConfig {
            poll_interval_ms: 0,
            ..StompConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_stomp_config(&dir.path().join("stomp.yaml"));
        assert_eq!(config, StompConfig::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_send_interval_ms: [oops").unwrap();
        assert_eq!(load_stomp_config(file.path()), StompConfig::default());
        assert!(read_stomp_config(file.path()).is_err());
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_capacity: 16\ndump_timeout_ms: 500").unwrap();
        let config = load_stomp_config(file.path());
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.dump_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("magicstomp/stomp.yaml"));
    }
}
