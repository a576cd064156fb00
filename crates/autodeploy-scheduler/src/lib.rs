//! Event queue and deploy worker for autodeploy.
//!
//! Intake hands accepted push events to an in-process FIFO queue; a single
//! worker drains it and runs one deploy at a time.

pub mod queue;
pub mod worker;

pub use queue::{EventQueue, EventReceiver, EventSender, QueueClosed};
pub use worker::{DeployWorker, Disposition};
