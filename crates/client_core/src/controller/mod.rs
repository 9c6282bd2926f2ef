//! Controller layer: client events and orchestration from view events to sync operations.

pub mod events;
pub mod orchestration;
