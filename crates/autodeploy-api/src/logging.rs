//! Tracing setup.
//!
//! Everything goes to the console under `RUST_LOG`. Request outcomes and
//! deploy runs are also appended to their own files, selected by target.

use anyhow::Context;
use autodeploy_config::LogConfig;
use autodeploy_core::log_target;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Keeps the file writers flushing. Hold for the life of the process.
#[must_use = "dropping the guards stops the log file writers"]
pub struct LogGuards {
    _requests: WorkerGuard,
    _deploys: WorkerGuard,
}

/// Open a log file for appending, creating it and its directory if needed.
pub fn open_log(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Install the global subscriber. Fails if either log file cannot be opened.
pub fn init(config: &LogConfig) -> anyhow::Result<LogGuards> {
    let (subscriber, guards) = subscriber(config)?;
    subscriber
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(guards)
}

/// Build the subscriber without installing it.
pub fn subscriber(
    config: &LogConfig,
) -> anyhow::Result<(impl Subscriber + Send + Sync + 'static, LogGuards)> {
    let (requests, requests_guard) =
        tracing_appender::non_blocking(open_log(&config.request_log_path())?);
    let (deploys, deploys_guard) =
        tracing_appender::non_blocking(open_log(&config.deploy_log_path())?);

    let console = fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    let requests_layer = fmt::layer()
        .with_writer(requests)
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter_fn(|meta| meta.target() == log_target::REQUESTS));

    let deploys_layer = fmt::layer()
        .with_writer(deploys)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .with_filter(filter_fn(|meta| meta.target() == log_target::DEPLOYS));

    let subscriber = tracing_subscriber::registry()
        .with(console)
        .with(requests_layer)
        .with(deploys_layer);

    Ok((
        subscriber,
        LogGuards {
            _requests: requests_guard,
            _deploys: deploys_guard,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("webhooks.log");

        writeln!(open_log(&path).unwrap(), "first").unwrap();
        writeln!(open_log(&path).unwrap(), "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_lines_are_routed_by_target() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            dir: dir.path().to_path_buf(),
            ..LogConfig::default()
        };

        let (subscriber, guards) = subscriber(&config).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: log_target::REQUESTS, "Push to master accepted");
            tracing::error!(target: log_target::DEPLOYS, "Exit error: npm ERR! boom");
            tracing::info!("console only");
        });
        // Flushes the non-blocking writers.
        drop(guards);

        let requests = std::fs::read_to_string(config.request_log_path()).unwrap();
        let deploys = std::fs::read_to_string(config.deploy_log_path()).unwrap();

        assert!(requests.contains("INFO Push to master accepted"), "{requests}");
        assert!(!requests.contains("Exit error"));
        assert!(!requests.contains("console only"));

        assert!(deploys.contains("Exit error: npm ERR! boom"), "{deploys}");
        assert!(!deploys.contains("ERROR"), "deploy log carries no level: {deploys}");
        assert!(!deploys.contains("Push to master"));
        assert!(!deploys.contains("console only"));
    }

    #[test]
    fn test_open_log_in_missing_parent_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        // A regular file where the directory should be.
        let err = open_log(&blocker.join("requests.log")).unwrap_err();
        assert!(err.to_string().contains("creating log directory"));
    }
}
