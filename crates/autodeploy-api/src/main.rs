//! autodeploy webhook server

use anyhow::Context;
use autodeploy_api::{AppState, logging, routes};
use autodeploy_config::{Config, DeployMode};
use autodeploy_scheduler::{DeployWorker, EventQueue};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "autodeploy-server")]
#[command(about = "Deploys a site whenever its GitHub branch is pushed", long_about = None)]
struct Args {
    /// Configuration file (KDL). Built-in defaults are used when omitted.
    #[arg(long, env = "AUTODEPLOY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration file
    #[arg(long, env = "AUTODEPLOY_PORT")]
    port: Option<u16>,

    /// Log deploys instead of running them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.dry_run {
        config.remote.mode = DeployMode::Noop;
    }

    let _log_guards = logging::init(&config.logs)?;
    let config = Arc::new(config);

    // Single consumer: deploys never overlap.
    let deployer = autodeploy_deployer::from_config(&config.remote);
    let (queue, receiver) = EventQueue::unbounded();
    let worker = DeployWorker::new(receiver, deployer, config.target.branch.clone()).spawn();

    let state = AppState::new(config.clone(), queue);
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(
        %addr,
        path = %config.server.path,
        repository = %config.target.repository,
        branch = %config.target.branch,
        mode = %config.remote.mode,
        "Listening for GitHub webhooks"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last sender, so the worker now drains what is
    // queued and stops.
    info!("Server stopped, finishing queued deploys");
    worker.await.context("deploy worker")?;
    info!("Deploy worker stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
