//! Route handlers, one module per resource

pub mod chart;
pub mod feedback;
pub mod health;
pub mod hosts;
pub mod stats;
pub mod sync;
