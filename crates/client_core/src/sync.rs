//! Sync controller: the only writer of the item store.
//!
//! Reads (list and search) are tagged with a generation when issued and only
//! the response carrying the latest generation may replace the store. Writes
//! are confirmed by the collaborator before the store changes and are gated
//! so that at most one write per [`WriteKey`] is outstanding. Clearing the
//! store starts a new epoch, and work scoped to an older epoch never
//! repopulates it.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, PoisonError,
    },
};

use shared::{
    domain::{MemoryId, UserId},
    protocol::{MemoryRecord, STATUS_DELETED, STATUS_REINDEXED, STATUS_SAVED, STATUS_UPDATED},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    controller::events::ClientEvent,
    error::SyncError,
    session::SessionScope,
    store::ItemStore,
    types::{
        CreateRequest, CreatedMemory, DeleteOutcome, Item, Operation, ReadOutcome, StoreContents,
        UpdateOutcome, WriteKey,
    },
    MemoryApi, ScanRequest,
};

const EVENT_CAPACITY: usize = 256;

pub struct SyncController {
    api: Arc<dyn MemoryApi>,
    inner: Mutex<SyncState>,
    in_flight: AtomicUsize,
    pending_writes: std::sync::Mutex<HashSet<WriteKey>>,
    events: broadcast::Sender<ClientEvent>,
}

struct SyncState {
    store: ItemStore,
    contents: StoreContents,
    latest_read: u64,
    epoch: u64,
}

#[derive(Debug, Clone)]
enum ReadKind {
    Listing,
    Search(String),
}

/// An issued list or search request.
#[derive(Debug, Clone)]
struct ReadTicket {
    generation: u64,
    epoch: u64,
    kind: ReadKind,
}

/// Keeps the loading counter and write gate accurate on every exit path.
struct InFlight<'a> {
    controller: &'a SyncController,
    write: Option<WriteKey>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.write.take() {
            self.controller.pending_writes().remove(&key);
        }
        if self.controller.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self
                .controller
                .events
                .send(ClientEvent::LoadingChanged(false));
        }
    }
}

impl SyncController {
    pub fn new(api: Arc<dyn MemoryApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            api,
            inner: Mutex::new(SyncState {
                store: ItemStore::new(),
                contents: StoreContents::Listing,
                latest_read: 0,
                epoch: 0,
            }),
            in_flight: AtomicUsize::new(0),
            pending_writes: std::sync::Mutex::new(HashSet::new()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// True while at least one operation is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn is_write_pending(&self, key: &WriteKey) -> bool {
        self.pending_writes().contains(key)
    }

    pub async fn items(&self) -> Vec<Item> {
        self.inner.lock().await.store.items().to_vec()
    }

    pub async fn item(&self, id: &MemoryId) -> Option<Item> {
        self.inner.lock().await.store.get(id).cloned()
    }

    pub async fn contents(&self) -> StoreContents {
        self.inner.lock().await.contents.clone()
    }

    /// Read-only access to the store without copying it.
    pub async fn with_store<R>(&self, f: impl FnOnce(&ItemStore) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard.store)
    }

    /// Binds `user_id` to the current store epoch.
    pub async fn scope(&self, user_id: &UserId) -> SessionScope {
        SessionScope {
            user_id: user_id.clone(),
            epoch: self.inner.lock().await.epoch,
        }
    }

    pub async fn fetch_all(&self, user_id: &UserId) -> Result<ReadOutcome, SyncError> {
        let scope = self.scope(user_id).await;
        self.fetch_all_scoped(&scope).await
    }

    /// Like [`Self::fetch_all`], but refused without a request once `scope` is stale.
    pub async fn fetch_all_scoped(&self, scope: &SessionScope) -> Result<ReadOutcome, SyncError> {
        let _in_flight = self.begin(None)?;
        let Some(ticket) = self.issue_read(ReadKind::Listing, scope).await else {
            return Ok(ReadOutcome::Superseded);
        };
        debug!(generation = ticket.generation, user_id = %scope.user_id, "fetching memories");
        let result = self.api.list_memories(&scope.user_id).await;
        self.finish_read(ticket, Operation::Fetch, result).await
    }

    /// Searches memories; an empty query falls back to the full listing.
    pub async fn search(&self, query: &str, user_id: &UserId) -> Result<ReadOutcome, SyncError> {
        let scope = self.scope(user_id).await;
        self.search_scoped(query, &scope).await
    }

    pub async fn search_scoped(
        &self,
        query: &str,
        scope: &SessionScope,
    ) -> Result<ReadOutcome, SyncError> {
        if query.trim().is_empty() {
            return self.fetch_all_scoped(scope).await;
        }

        let _in_flight = self.begin(None)?;
        let Some(ticket) = self
            .issue_read(ReadKind::Search(query.to_string()), scope)
            .await
        else {
            return Ok(ReadOutcome::Superseded);
        };
        debug!(generation = ticket.generation, query, "searching memories");
        let result = self.api.search_memories(query, &scope.user_id).await;
        self.finish_read(ticket, Operation::Search, result).await
    }

    /// Uploads a new memory, then refreshes the listing to pick up server-side tags.
    pub async fn create_item(
        &self,
        request: CreateRequest,
        user_id: &UserId,
    ) -> Result<CreatedMemory, SyncError> {
        let scope = self.scope(user_id).await;
        self.create_item_scoped(request, &scope).await
    }

    /// Like [`Self::create_item`]; the follow-up refresh only runs within `scope`.
    pub async fn create_item_scoped(
        &self,
        request: CreateRequest,
        scope: &SessionScope,
    ) -> Result<CreatedMemory, SyncError> {
        let location = request.location.trim().to_string();
        let file = match request.file {
            Some(file) if !location.is_empty() => file,
            _ => {
                return Err(self.fail(SyncError::Validation(
                    "An image and a location are required.".to_string(),
                )))
            }
        };
        if self.inner.lock().await.epoch != scope.epoch {
            return Err(self.fail(SyncError::NoSession));
        }

        let _in_flight = self
            .begin(Some(WriteKey::Create))
            .map_err(|err| self.fail(err))?;
        let response = self
            .api
            .scan(ScanRequest {
                file,
                user_id: scope.user_id.clone(),
                location,
                manual_tags: request.tags,
            })
            .await
            .map_err(|err| self.fail(err))?;

        if response.status != STATUS_SAVED {
            return Err(self.fail(SyncError::unexpected_status(
                Operation::Create,
                STATUS_SAVED,
                &response.status,
                response.error.as_deref(),
            )));
        }
        info!(tags = ?response.tags, "memory saved");

        // The refresh reports its own failure; the memory is stored either way.
        match self.fetch_all_scoped(scope).await {
            Ok(ReadOutcome::Superseded) => {
                debug!(epoch = scope.epoch, "skipped refresh after create");
            }
            Ok(ReadOutcome::Applied { .. }) => {}
            Err(err) => warn!(%err, "refresh after create failed"),
        }

        Ok(CreatedMemory {
            tags: response.tags,
            image_url: response.url,
        })
    }

    /// Applies an edit once the collaborator confirms it with normalized tags.
    pub async fn update_item(
        &self,
        id: &MemoryId,
        location: &str,
        tags: &str,
    ) -> Result<UpdateOutcome, SyncError> {
        let _in_flight = self
            .begin(Some(WriteKey::Update(id.clone())))
            .map_err(|err| self.fail(err))?;
        let response = self
            .api
            .update_memory(id, location, tags)
            .await
            .map_err(|err| self.fail(err))?;

        if response.status != STATUS_UPDATED {
            return Err(self.fail(SyncError::unexpected_status(
                Operation::Update,
                STATUS_UPDATED,
                &response.status,
                response.error.as_deref(),
            )));
        }
        let Some(confirmed_tags) = response.data.as_ref().and_then(|data| data.tags.clone())
        else {
            return Err(self.fail(SyncError::contract(
                Operation::Update,
                "confirmation is missing data.tags",
            )));
        };
        let confirmed_location = response
            .data
            .and_then(|data| data.location)
            .unwrap_or_else(|| location.to_string());

        let mut guard = self.inner.lock().await;
        let Some(existing) = guard.store.get(id).cloned() else {
            drop(guard);
            info!(memory_id = %id, "update confirmed for memory no longer in view");
            return Ok(UpdateOutcome::NotInView);
        };
        let updated = Item {
            location: confirmed_location,
            tags: confirmed_tags,
            ..existing
        };
        guard.store.upsert(updated.clone());
        drop(guard);

        info!(memory_id = %id, "memory updated");
        let _ = self.events.send(ClientEvent::ItemUpserted(updated.clone()));
        Ok(UpdateOutcome::Applied(updated))
    }

    /// Deletes a memory. Deleting an id that is already gone succeeds.
    pub async fn delete_item(&self, id: &MemoryId) -> Result<DeleteOutcome, SyncError> {
        let _in_flight = self
            .begin(Some(WriteKey::Delete(id.clone())))
            .map_err(|err| self.fail(err))?;
        let response = self
            .api
            .delete_memory(id)
            .await
            .map_err(|err| self.fail(err))?;

        if response.status != STATUS_DELETED {
            return Err(self.fail(SyncError::unexpected_status(
                Operation::Delete,
                STATUS_DELETED,
                &response.status,
                response.error.as_deref(),
            )));
        }

        let removed = self.inner.lock().await.store.remove(id);
        if !removed {
            debug!(memory_id = %id, "delete confirmed for memory already absent");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        info!(memory_id = %id, "memory deleted");
        let _ = self.events.send(ClientEvent::ItemRemoved(id.clone()));
        Ok(DeleteOutcome::Removed)
    }

    /// Asks the collaborator to embed images it has not indexed yet.
    pub async fn reindex(&self) -> Result<u64, SyncError> {
        let _in_flight = self.begin(None)?;
        let response = self.api.reindex().await.map_err(|err| self.fail(err))?;
        if response.status != STATUS_REINDEXED {
            return Err(self.fail(SyncError::unexpected_status(
                Operation::Reindex,
                STATUS_REINDEXED,
                &response.status,
                response.error.as_deref(),
            )));
        }
        info!(updated = response.updated, "search index rebuilt");
        Ok(response.updated)
    }

    /// Empties the store, invalidates every outstanding read and starts a new epoch.
    pub async fn clear(&self) {
        let epoch = {
            let mut guard = self.inner.lock().await;
            guard.store.clear();
            guard.contents = StoreContents::Listing;
            guard.latest_read += 1;
            guard.epoch += 1;
            guard.epoch
        };
        debug!(epoch, "store cleared");
        let _ = self.events.send(ClientEvent::ItemsReplaced {
            count: 0,
            contents: StoreContents::Listing,
        });
    }

    fn pending_writes(&self) -> std::sync::MutexGuard<'_, HashSet<WriteKey>> {
        self.pending_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, write: Option<WriteKey>) -> Result<InFlight<'_>, SyncError> {
        if let Some(key) = &write {
            if !self.pending_writes().insert(key.clone()) {
                return Err(SyncError::InFlight {
                    operation: key.operation(),
                    target: key.target(),
                });
            }
        }
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = self.events.send(ClientEvent::LoadingChanged(true));
        }
        Ok(InFlight {
            controller: self,
            write,
        })
    }

    /// Returns `None` when `scope` belongs to an epoch that has been cleared.
    async fn issue_read(&self, kind: ReadKind, scope: &SessionScope) -> Option<ReadTicket> {
        let mut guard = self.inner.lock().await;
        if guard.epoch != scope.epoch {
            info!(
                scope_epoch = scope.epoch,
                epoch = guard.epoch,
                "refusing read for a cleared session"
            );
            return None;
        }
        guard.latest_read += 1;
        Some(ReadTicket {
            generation: guard.latest_read,
            epoch: scope.epoch,
            kind,
        })
    }

    async fn finish_read(
        &self,
        ticket: ReadTicket,
        operation: Operation,
        result: Result<Vec<MemoryRecord>, SyncError>,
    ) -> Result<ReadOutcome, SyncError> {
        let records = result.map_err(|err| self.fail(err))?;
        let items: Vec<Item> = records.into_iter().map(Item::from).collect();

        let mut guard = self.inner.lock().await;
        if guard.latest_read != ticket.generation || guard.epoch != ticket.epoch {
            let latest = guard.latest_read;
            drop(guard);
            info!(
                %operation,
                generation = ticket.generation,
                latest,
                "discarding superseded response"
            );
            let _ = self.events.send(ClientEvent::StaleResponseDiscarded {
                operation,
                generation: ticket.generation,
            });
            return Ok(ReadOutcome::Superseded);
        }

        guard.store.replace_all(items);
        guard.contents = match ticket.kind {
            ReadKind::Listing => StoreContents::Listing,
            ReadKind::Search(query) => StoreContents::SearchResults { query },
        };
        let count = guard.store.len();
        let contents = guard.contents.clone();
        drop(guard);

        info!(%operation, generation = ticket.generation, count, "store replaced");
        let _ = self
            .events
            .send(ClientEvent::ItemsReplaced { count, contents });
        Ok(ReadOutcome::Applied { items: count })
    }

    /// Logs and broadcasts a failure before handing it back to the caller.
    pub(crate) fn fail(&self, err: SyncError) -> SyncError {
        warn!(code = ?err.code(), operation = ?err.operation(), %err, "operation failed");
        let _ = self.events.send(ClientEvent::Notice(err.notice()));
        err
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
