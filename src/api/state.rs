//! API shared state

use std::sync::Arc;

use crate::actors::SyncHandle;
use crate::storage::EntityStore;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Entity store for read queries and feedback
    pub store: Arc<dyn EntityStore>,

    /// Scheduler for on-demand runs
    pub scheduler: SyncHandle,
}

impl ApiState {
    pub fn new(store: Arc<dyn EntityStore>, scheduler: SyncHandle) -> Self {
        Self { store, scheduler }
    }
}
