//! Deployer that only logs its intent.

use async_trait::async_trait;
use autodeploy_config::RemoteConfig;
use autodeploy_core::log_target;
use autodeploy_core::{DeployOutcome, Deployer, PushEvent};
use tracing::info;

/// Stands in for [`crate::SshDeployer`] in staging and tests.
pub struct NoopDeployer {
    destination: String,
    remote_command: String,
}

impl NoopDeployer {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            destination: config.destination(),
            remote_command: config.remote_command(),
        }
    }
}

#[async_trait]
impl Deployer for NoopDeployer {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn deploy(&self, event: &PushEvent) -> DeployOutcome {
        info!(
            target: log_target::DEPLOYS,
            event_id = %event.id,
            "Dry run: would run `{}` on {}",
            self.remote_command,
            self.destination
        );
        Ok(())
    }
}
