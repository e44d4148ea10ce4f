//! Table/worker configuration loading.
//!
//! Mirrors `config.py`'s `TableConfig`/`WorkerConfig` field shapes, but
//! drops the `ConfigProvider` lazy-singleton: callers load a config once at
//! startup and pass it down explicitly, the way the teacher's `Server::run`
//! takes its bind address from an argument rather than a global.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_timeout_minutes() -> i64 {
    10
}

fn default_curriculum_path() -> PathBuf {
    PathBuf::from("curriculum.json")
}

fn default_save_period_seconds() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_timeout_minutes")]
    pub default_timeout_minutes: i64,
    #[serde(default = "default_curriculum_path")]
    pub curriculum_path: PathBuf,
    #[serde(default = "default_save_period_seconds")]
    pub curriculum_save_period_seconds: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_timeout_minutes: default_timeout_minutes(),
            curriculum_path: default_curriculum_path(),
            curriculum_save_period_seconds: default_save_period_seconds(),
        }
    }
}

impl TableConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("table config file not found at {}: {e}", path.display()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Worker-side config. The worker's internal fan-out runner is out of
/// scope; this only carries what the reservation loop needs to reach the
/// table node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub table_node_url: String,
    #[serde(default)]
    pub capability_set: Vec<String>,
    #[serde(default = "default_max_size")]
    pub max_size: i64,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_max_size() -> i64 {
    1000
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl WorkerConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("worker config file not found at {}: {e}", path.display()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_config.json");
        std::fs::write(&path, r#"{"default_timeout_minutes": 20, "curriculum_path": "/tmp/c.json", "curriculum_save_period_seconds": 30}"#).unwrap();
        let config = TableConfig::load_from_file(&path).unwrap();
        assert_eq!(config.default_timeout_minutes, 20);
        assert_eq!(config.curriculum_path, PathBuf::from("/tmp/c.json"));
        assert_eq!(config.curriculum_save_period_seconds, 30);
    }

    #[test]
    fn table_config_missing_file_errors() {
        let result = TableConfig::load_from_file(Path::new("/nonexistent/table_config.json"));
        assert!(result.is_err());
    }
}
