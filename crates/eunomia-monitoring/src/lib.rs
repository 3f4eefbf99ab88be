//! Logging setup for the Eunomia engine.
//!
//! Everything in the workspace logs through `tracing`; this crate installs
//! the subscriber that decides where those events go.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub mod logging;

pub use logging::{build_subscriber, init_logging, init_test_tracing, LogExt};

/// Configuration for initializing the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Log level filter (e.g., "info,eunomia_core=debug"). `RUST_LOG` wins when set.
    pub log_filter: String,
    /// Emit JSON lines instead of the pretty human format
    pub enable_json_logging: bool,
    /// Also append JSON logs to this file
    pub log_file: Option<PathBuf>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "eunomia".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_file: None,
        }
    }
}

/// Initialize the logging system
pub fn init(config: &MonitoringConfig) -> anyhow::Result<()> {
    init_logging(config)?;
    info!("Monitoring initialized with config: {:?}", config);
    Ok(())
}

/// Shutdown the logging system
pub fn shutdown() {
    info!("Shutting down monitoring system");
}
