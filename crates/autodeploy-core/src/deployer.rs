//! Deployer trait and deploy outcomes.
//!
//! A deployer performs the one deploy action this service exists for. The
//! worker calls it at most once at a time.

use async_trait::async_trait;

use crate::{DeployError, PushEvent};

/// Result of one deploy invocation. Logged, never stored.
pub type DeployOutcome = std::result::Result<(), DeployError>;

/// Trait for deployers.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Name of this deployer.
    fn name(&self) -> &'static str;

    /// Run the deploy triggered by `event`.
    ///
    /// Implementations must eventually return; an invocation that can hang
    /// needs its own timeout.
    async fn deploy(&self, event: &PushEvent) -> DeployOutcome;
}
