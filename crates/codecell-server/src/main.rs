//! Codecell execution server
//!
//! HTTP front end for the sandboxed code execution service: accepts
//! programs over `POST /execute_code` and returns their output, exit
//! status, and timeout/truncation flags.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use codecell::{Config, Orchestrator, prepare_cgroup};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod routes;

#[derive(Parser)]
#[command(name = "codecell-server")]
#[command(about = "HTTP server for sandboxed code execution")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let mut config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    // Set up cgroup hierarchy if cgroup mode is enabled
    if config.cgroup {
        match prepare_cgroup(&config.cg_root) {
            Ok(true) => debug!("cgroup hierarchy ready"),
            Ok(false) => {
                warn!(
                    "cgroup support unavailable (memory controller not found), falling back to RLIMIT_AS"
                );
                config.cgroup = false;
            }
            Err(e) => {
                warn!("cgroup setup failed: {e}, falling back to RLIMIT_AS memory limiting");
                config.cgroup = false;
            }
        }
    }

    info!(
        languages = config.languages.len(),
        max_concurrency = config.max_concurrency,
        cgroup = config.cgroup,
        "execution service configured"
    );

    let service = Arc::new(Orchestrator::new(config));
    let app = routes::router(service);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!(addr = %cli.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM so in-flight executions can finish and
/// their sandboxes get released before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
