//! Client core for the recall inventory tracker: item store, sync controller
//! and view-state machine.

use async_trait::async_trait;
use shared::{
    domain::{MemoryId, UserId},
    protocol::{DeleteResponse, MemoryRecord, ReindexResponse, ScanResponse, UpdateResponse},
};

pub mod controller;
pub mod error;
pub mod session;
pub mod store;
pub mod sync;
pub mod transport;
pub mod types;
pub mod view;

pub use controller::{events::ClientEvent, orchestration::RecallApp};
pub use error::SyncError;
pub use session::{Session, SessionScope};
pub use store::ItemStore;
pub use sync::SyncController;
pub use transport::HttpMemoryApi;
pub use types::{
    CreateRequest, CreatedMemory, DeleteOutcome, ImageUpload, Item, Operation, ReadOutcome,
    StoreContents, UpdateOutcome, WriteKey,
};
pub use view::{Command, Mode, ViewEvent, ViewState};

/// Multipart body of `POST /api/scan`.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub file: ImageUpload,
    pub user_id: UserId,
    pub location: String,
    pub manual_tags: String,
}

/// The remote memory service.
///
/// Implementations report transport failures and undecodable bodies; checking
/// the `status` literal of a decoded body is left to the caller.
#[async_trait]
pub trait MemoryApi: Send + Sync {
    async fn list_memories(&self, user_id: &UserId) -> Result<Vec<MemoryRecord>, SyncError>;
    async fn search_memories(
        &self,
        query: &str,
        user_id: &UserId,
    ) -> Result<Vec<MemoryRecord>, SyncError>;
    async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, SyncError>;
    async fn update_memory(
        &self,
        id: &MemoryId,
        location: &str,
        manual_tags: &str,
    ) -> Result<UpdateResponse, SyncError>;
    async fn delete_memory(&self, id: &MemoryId) -> Result<DeleteResponse, SyncError>;
    async fn reindex(&self) -> Result<ReindexResponse, SyncError>;
}

#[cfg(test)]
#[path = "tests/fake_api.rs"]
pub(crate) mod fake_api;
