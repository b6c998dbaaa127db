use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::order::{ReconcilerConfig, WorkflowConfig};
use crate::upstream::Backoff;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("postgres_url is required when storage is postgres")]
    MissingPostgresUrl,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    #[serde(default = "ServiceConfig::users")]
    pub users: ServiceConfig,
    #[serde(default = "ServiceConfig::payment")]
    pub payment: ServiceConfig,
    #[serde(default = "ServiceConfig::order")]
    pub order: ServiceConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub reconciler: ReconcilerSettings,
    #[serde(default)]
    pub storage: StorageKind,
    /// PostgreSQL connection URL, required for `storage: postgres`
    #[serde(default)]
    pub postgres_url: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "order_fulfillment.log".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

impl ServiceConfig {
    fn on(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
        }
    }

    pub fn users() -> Self {
        Self::on(8080)
    }

    pub fn payment() -> Self {
        Self::on(8081)
    }

    pub fn order() -> Self {
        Self::on(8082)
    }
}

/// How the Order and Payment services reach the Users service
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub users_url: String,
    pub timeout_ms: u64,
    /// Attempts for idempotent calls, first one included
    pub read_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            users_url: "http://localhost:8080".to_string(),
            timeout_ms: 10_000,
            read_retries: 3,
            backoff_base_ms: 50,
            backoff_max_ms: 1_000,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            self.read_retries,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WorkflowSettings {
    pub debit_max_attempts: u32,
    pub store_timeout_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            debit_max_attempts: 3,
            store_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReconcilerSettings {
    pub enabled: bool,
    pub scan_interval_secs: u64,
    pub stale_threshold_secs: u64,
    pub batch_size: usize,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 30,
            stale_threshold_secs: 60,
            batch_size: 100,
        }
    }
}

impl ReconcilerSettings {
    pub fn to_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            scan_interval: Duration::from_secs(self.scan_interval_secs),
            stale_threshold: Duration::from_secs(self.stale_threshold_secs),
            batch_size: self.batch_size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Postgres,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageKind::Postgres && self.postgres_url.is_none() {
            return Err(ConfigError::MissingPostgresUrl);
        }
        Ok(())
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            debit_max_attempts: self.workflow.debit_max_attempts,
            store_timeout: Duration::from_millis(self.workflow.store_timeout_ms),
            backoff: self.upstream.backoff(),
        }
    }
}
