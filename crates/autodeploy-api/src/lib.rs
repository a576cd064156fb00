//! Webhook server for autodeploy.
//!
//! Receives GitHub push deliveries, decides whether they should trigger a
//! deploy and queues the ones that should.

pub mod error;
pub mod intake;
pub mod logging;
pub mod routes;
pub mod state;

pub use state::AppState;
