//! AirCat daemon - main entry point
//!
//! Loads the configuration, opens the audio output and every module,
//! then serves the HTTP API until SIGINT or SIGTERM. On shutdown the
//! modules are closed and the configuration is written back.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aircat_common::config::resolve_config_path;
use aircat_common::{ConfigStore, Facades};
use aircat_d::audio::{self, LocalMedia};
use aircat_common::discovery::Discovery;
use aircat_d::discovery::LoggingDiscovery;
use aircat_d::{api, build_info, modules, AppContext, SERVICE_KIND, SERVICE_NAME};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Interval between discovery event polls
const DISCOVERY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Command-line arguments for aircat
#[derive(Parser, Debug)]
#[command(name = "aircat")]
#[command(about = "AirCat networked media daemon")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "AIRCAT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration for this run
    #[arg(short, long, env = "AIRCAT_PORT")]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "aircat=debug,aircat_d=debug,aircat_common=debug,aircat_files=debug,tower_http=debug"
    } else {
        "aircat=info,aircat_d=info,aircat_common=info,aircat_files=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting AirCat {} (git {}, built {}, {})",
        build_info::VERSION,
        build_info::GIT_HASH,
        build_info::BUILD_TIMESTAMP,
        build_info::BUILD_PROFILE
    );

    let config_path = resolve_config_path(args.config.as_deref(), "AIRCAT_CONFIG");
    info!("Configuration file: {}", config_path.display());
    let store = ConfigStore::open(config_path);

    let discovery = Arc::new(LoggingDiscovery::new());
    let facades = Facades {
        output: audio::open_output(),
        media: Arc::new(LocalMedia),
        discovery: discovery.clone(),
    };

    let ctx = tokio::task::spawn_blocking(move || {
        AppContext::build(store, modules::MODULES, facades)
    })
    .await
    .context("Failed to open modules")?;

    let port = args.port.unwrap_or_else(|| ctx.core.httpd().port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            ctx.close().await;
            return Err(e).context(format!("Failed to bind to {}", addr));
        }
    };

    info!("Starting HTTP server on {}", addr);
    ctx.facades.discovery.publish(SERVICE_NAME, SERVICE_KIND, port);

    let poller = {
        let discovery = discovery.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(DISCOVERY_POLL_INTERVAL);
            loop {
                interval.tick().await;
                discovery.poll();
            }
        })
    };

    let app = api::create_router(ctx.clone());
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poller.abort();
    ctx.facades.discovery.unpublish(SERVICE_NAME);

    ctx.close().await;

    served.context("Server error")?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
