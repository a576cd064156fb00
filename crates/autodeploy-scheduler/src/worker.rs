//! Worker that runs deploys for queued push events.

use crate::queue::EventReceiver;
use autodeploy_core::log_target;
use autodeploy_core::{DeployError, Deployer, GitRef, PushEvent};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const BANNER: &str = "-------------------- RECEIVED WEBHOOK --------------------";
const FOOTER: &str = "----------------------------------------------------------";

/// Terminal state of one dequeued event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Ref could not be parsed; nothing was run.
    InvalidRef,
    /// Push to another branch; nothing was run.
    Skipped { branch: String },
    Succeeded,
    Failed { message: String },
}

/// The single consumer of the event queue.
///
/// Events are handled strictly one after another, so two deploys never run
/// at the same time.
pub struct DeployWorker {
    receiver: EventReceiver,
    deployer: Arc<dyn Deployer>,
    branch: String,
}

impl DeployWorker {
    pub fn new(
        receiver: EventReceiver,
        deployer: Arc<dyn Deployer>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            receiver,
            deployer,
            branch: branch.into(),
        }
    }

    /// Run the worker on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the worker loop until every sender is gone and the queue is empty.
    pub async fn run(mut self) {
        info!(
            deployer = self.deployer.name(),
            branch = %self.branch,
            "Starting deploy worker"
        );

        while let Some(event) = self.receiver.recv().await {
            let event_id = event.id;
            let disposition = self.process(event).await;
            info!(
                event_id = %event_id,
                ?disposition,
                queued = self.receiver.pending(),
                "Event processed"
            );
        }

        info!("Event queue closed, deploy worker stopping");
    }

    /// Handle one event, writing its start and end markers to the deploy log.
    pub async fn process(&self, event: PushEvent) -> Disposition {
        info!(target: log_target::DEPLOYS, "\n{BANNER}");
        info!(
            target: log_target::DEPLOYS,
            event_id = %event.id,
            delivery = event.delivery.as_deref().unwrap_or("-"),
            "Time: {}",
            Utc::now().to_rfc3339()
        );

        let disposition = self.handle(event).await;

        info!(target: log_target::DEPLOYS, "{FOOTER}");
        disposition
    }

    async fn handle(&self, event: PushEvent) -> Disposition {
        // Intake already filtered, but this is the only place a deploy starts,
        // so the branch is checked again here.
        let git_ref = match GitRef::parse(&event.r#ref) {
            Ok(git_ref) => git_ref,
            Err(e) => {
                warn!(target: log_target::DEPLOYS, "{e}, omitting deploy");
                return Disposition::InvalidRef;
            }
        };

        if git_ref.branch() != self.branch {
            info!(
                target: log_target::DEPLOYS,
                "Branch is {} and not {}, omitting deploy",
                git_ref.branch(),
                self.branch
            );
            return Disposition::Skipped {
                branch: git_ref.branch().to_string(),
            };
        }

        let waited_ms = (Utc::now() - event.received_at).num_milliseconds().max(0);
        info!(
            target: log_target::DEPLOYS,
            sha = event.short_sha().unwrap_or("-"),
            pusher = event.pusher_name(),
            waited_ms,
            "New commit on {} detected. Starting deploy...",
            self.branch
        );

        let started = Instant::now();
        let deployer = Arc::clone(&self.deployer);

        // The deploy runs on its own task so a panic in the deployer is
        // reported here instead of taking the loop down. It is awaited before
        // the next event is taken.
        let outcome = match tokio::spawn(async move { deployer.deploy(&event).await }).await {
            Ok(outcome) => outcome,
            Err(e) => Err(DeployError::Aborted(e.to_string())),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                info!(target: log_target::DEPLOYS, elapsed_ms, "Deploy succeeded");
                Disposition::Succeeded
            }
            Err(e) => {
                error!(target: log_target::DEPLOYS, elapsed_ms, "Deploy failed: {e}");
                if let Some(stderr) = e.stderr() {
                    error!(target: log_target::DEPLOYS, "Exit error: {}", stderr.trim_end());
                }
                Disposition::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
