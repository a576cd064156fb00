//! Application state.

use autodeploy_config::Config;
use autodeploy_core::EventFilter;
use autodeploy_scheduler::EventSender;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub filter: Arc<EventFilter>,
    pub queue: EventSender,
}

impl AppState {
    pub fn new(config: Arc<Config>, queue: EventSender) -> Self {
        let filter = Arc::new(EventFilter::new(
            config.target.repository.clone(),
            config.target.branch.clone(),
        ));

        Self {
            config,
            filter,
            queue,
        }
    }
}
