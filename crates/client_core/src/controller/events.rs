//! Events broadcast by the sync controller for the presentation layer.

use shared::{domain::MemoryId, error::ApiError};

use crate::types::{Item, Operation, StoreContents};

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ItemsReplaced {
        count: usize,
        contents: StoreContents,
    },
    ItemUpserted(Item),
    ItemRemoved(MemoryId),
    LoadingChanged(bool),
    StaleResponseDiscarded {
        operation: Operation,
        generation: u64,
    },
    /// A failed operation the user should be told about.
    Notice(ApiError),
}
