//! Autoflow daemon - workflow orchestration service
//!
//! The daemon provides:
//! - REST API for submitting and inspecting workflow executions
//! - Bounded admission queue drained under a concurrency cap
//! - Rate-limited automated triggers
//! - Periodic retention sweeps of execution history

use autoflow_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Autoflow Daemon CLI
#[derive(Parser)]
#[command(name = "autoflowd")]
#[command(about = "Autoflow Daemon - Workflow orchestration service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AUTOFLOW_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides the configuration file)
    #[arg(short, long, env = "AUTOFLOW_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "AUTOFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "AUTOFLOW_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Print startup banner
    println!(
        r#"
     _         _         __ _
    / \  _   _| |_ ___  / _| | _____      __
   / _ \| | | | __/ _ \| |_| |/ _ \ \ /\ / /
  / ___ \ |_| | || (_) |  _| | (_) \ V  V /
 /_/   \_\__,_|\__\___/|_| |_|\___/ \_/\_/

  Workflow Orchestration Daemon
  Version: {}
  Engine: {}
  Listening: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.gateway.engine_url,
        config.server.listen_addr
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
