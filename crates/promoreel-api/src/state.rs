//! Application state.

use promoreel_scheduler::{Engine, Scheduler, StatusService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub status: StatusService,
}

impl AppState {
    pub fn new(engine: &Engine) -> Self {
        Self {
            scheduler: engine.scheduler(),
            status: engine.status(),
        }
    }
}
