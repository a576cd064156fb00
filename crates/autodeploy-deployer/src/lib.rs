//! Deployment backends for autodeploy.
//!
//! Provides deployer implementations:
//! - ssh (production): runs the deploy script on the remote host
//! - noop (staging/tests): only logs what it would have done

pub mod noop;
pub mod ssh;

use autodeploy_config::{DeployMode, RemoteConfig};
use std::sync::Arc;

pub use autodeploy_core::deployer::{DeployOutcome, Deployer};
pub use noop::NoopDeployer;
pub use ssh::SshDeployer;

/// Build the deployer selected by `config.mode`.
pub fn from_config(config: &RemoteConfig) -> Arc<dyn Deployer> {
    match config.mode {
        DeployMode::Ssh => Arc::new(SshDeployer::new(config)),
        DeployMode::Noop => Arc::new(NoopDeployer::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = RemoteConfig::default();
        assert_eq!(from_config(&config).name(), "ssh");

        config.mode = DeployMode::Noop;
        assert_eq!(from_config(&config).name(), "noop");
    }
}
