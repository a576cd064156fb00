//! Core domain types and traits for autodeploy.
//!
//! This crate contains:
//! - Webhook signature verification
//! - Push event parsing
//! - Repository/branch filtering
//! - The deployer trait and deploy outcomes

pub mod deployer;
pub mod error;
pub mod event;
pub mod filter;
pub mod id;
pub mod signature;

pub use deployer::{DeployOutcome, Deployer};
pub use error::{DeployError, FilterError, ParseError, SignatureError};
pub use event::{PushEvent, parse_event};
pub use filter::{EventFilter, FilterDecision, GitRef};
pub use id::EventId;
pub use signature::{WebhookSecret, verify_signature};

/// Tracing targets routed to the two append-only log files.
pub mod log_target {
    /// Outcome of every inbound webhook request.
    pub const REQUESTS: &str = "autodeploy::requests";
    /// Every deploy attempt and the remote output it produced.
    pub const DEPLOYS: &str = "autodeploy::deploys";
}
