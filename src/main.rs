use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use eunomia::{builtin_registry, Engine, EngineConfig, NodeRef};
use eunomia_monitoring::LogExt;

/// Operator CLI for the Eunomia propagation engine
#[derive(Parser, Debug)]
#[command(name = "eunomia", version, about = "Node graph propagation engine")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "EUNOMIA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the schema and seed the default graph
    Init,

    /// Check that every callback binding is registered
    Validate,

    /// Set an input parameter and cascade from its node
    SetParam {
        /// Node ID (`12` or `#12`) or name (`name:42` for an all-digit name)
        node: NodeRef,
        /// Input port name
        port: String,
        /// Parameter key
        key: String,
        /// Raw value to store
        value: String,
    },

    /// Run a cascade from a node
    Run {
        /// Node ID (`12` or `#12`) or name (`name:42` for an all-digit name)
        node: NodeRef,
    },

    /// Print the graph as JSON
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, rejected) =
        EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    eunomia_monitoring::init(&config.monitoring_config())
        .context("Failed to initialize monitoring")?;

    if let Some(path) = &cli.config {
        info!(path = %path.display(), "Loaded configuration file");
    }
    for setting in &rejected {
        setting.log();
    }

    let engine = Engine::open(&config, builtin_registry())
        .await
        .context("Failed to open graph store")?;

    match cli.command {
        Commands::Init => {
            if config.seed_defaults {
                let report = engine.seed().await.log_err("Seeding failed")?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                info!("Schema ready, seeding disabled");
            }
        }
        Commands::Validate => {
            engine
                .validate()
                .await
                .log_err("Callback validation failed")?;
            println!("All callback bindings resolve");
        }
        Commands::SetParam {
            node,
            port,
            key,
            value,
        } => {
            let report = engine
                .set_input_parameter(&node, &port, &key, &value)
                .await
                .log_err("Cascade failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Run { node } => {
            engine.validate().await.log_err("Callback validation failed")?;
            let report = engine.run(&node).await.log_err("Cascade failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Show => {
            let dump = engine.dump().await?;
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }

    eunomia_monitoring::shutdown();
    Ok(())
}
