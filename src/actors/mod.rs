//! Actor-based scheduling
//!
//! The sync scheduler runs as an independent async task and is controlled
//! through a cloneable handle.
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the actor has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels carry run reports and status back

pub mod messages;
pub mod scheduler;

pub use messages::{SchedulerCommand, SchedulerStatus};
pub use scheduler::{SyncActor, SyncHandle};
