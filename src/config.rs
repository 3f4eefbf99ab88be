//! Configuration for the Eunomia engine
//!
//! Values come from an optional YAML file, then environment variables.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use eunomia_core::ExecutorOptions;
use eunomia_monitoring::MonitoringConfig;
use eunomia_state_sqlite::SqliteConfig;

/// Connection string selecting the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// An environment override that failed to parse and was ignored.
///
/// Loading happens before logging is installed, so these are handed back to
/// the caller to [`log`](Self::log) once a subscriber exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSetting {
    /// Environment variable name
    pub variable: &'static str,
    /// The value it held
    pub value: String,
}

impl RejectedSetting {
    fn new(variable: &'static str, value: &str) -> Self {
        Self {
            variable,
            value: value.to_string(),
        }
    }

    /// Emit the warning for this setting
    pub fn log(&self) {
        warn!(
            variable = self.variable,
            value = %self.value,
            "Ignoring invalid {} value", self.variable
        );
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite connection string, or `memory://` for a process-local graph
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum pooled SQLite connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Log filter directives
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON logs
    #[serde(default)]
    pub json_logs: bool,

    /// Also write JSON logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Fail a cascade when a callback writes to an output port its node lacks
    #[serde(default)]
    pub strict_output_ports: bool,

    /// Create the default node types and nodes on `init`
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
}

fn default_database_url() -> String {
    "sqlite://system.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_seed_defaults() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            log_filter: default_log_filter(),
            json_logs: false,
            log_file: None,
            strict_output_ports: false,
            seed_defaults: default_seed_defaults(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional YAML file and the process environment.
    ///
    /// Also returns the environment overrides that were ignored.
    pub fn load(path: Option<&Path>) -> anyhow::Result<(Self, Vec<RejectedSetting>)> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let rejected = config.apply_env(|name| std::env::var(name).ok());
        Ok((config, rejected))
    }

    /// Read a YAML configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Override fields from environment variables read through `lookup`.
    ///
    /// Values that fail to parse leave the field untouched and are returned.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<RejectedSetting>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();

        if let Some(url) = lookup("EUNOMIA_DATABASE_URL") {
            self.database_url = url;
        }

        if let Some(max) = lookup("EUNOMIA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(max) if max > 0 => self.max_connections = max,
                _ => rejected.push(RejectedSetting::new("EUNOMIA_MAX_CONNECTIONS", &max)),
            }
        }

        if let Some(filter) = lookup("EUNOMIA_LOG_FILTER") {
            self.log_filter = filter;
        }

        if let Some(json) = lookup("EUNOMIA_JSON_LOGS") {
            match parse_flag(&json) {
                Some(json) => self.json_logs = json,
                None => rejected.push(RejectedSetting::new("EUNOMIA_JSON_LOGS", &json)),
            }
        }

        if let Some(file) = lookup("EUNOMIA_LOG_FILE") {
            self.log_file = (!file.is_empty()).then(|| PathBuf::from(file));
        }

        if let Some(strict) = lookup("EUNOMIA_STRICT_OUTPUT_PORTS") {
            match parse_flag(&strict) {
                Some(strict) => self.strict_output_ports = strict,
                None => rejected.push(RejectedSetting::new("EUNOMIA_STRICT_OUTPUT_PORTS", &strict)),
            }
        }

        if let Some(seed) = lookup("EUNOMIA_SEED_DEFAULTS") {
            match parse_flag(&seed) {
                Some(seed) => self.seed_defaults = seed,
                None => rejected.push(RejectedSetting::new("EUNOMIA_SEED_DEFAULTS", &seed)),
            }
        }

        rejected
    }

    /// Whether the graph lives in process memory
    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    /// Logging settings
    pub fn monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: "eunomia".to_string(),
            log_filter: self.log_filter.clone(),
            enable_json_logging: self.json_logs,
            log_file: self.log_file.clone(),
        }
    }

    /// SQLite store settings
    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig {
            connection_string: self.database_url.clone(),
            max_connections: self.max_connections,
            ..Default::default()
        }
    }

    /// Node executor settings
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            strict_output_ports: self.strict_output_ports,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
