//! Scripted in-process collaborator used by the controller tests.

use std::collections::HashMap;

use async_trait::async_trait;
use shared::{
    domain::{MemoryId, UserId},
    protocol::{
        DeleteResponse, MemoryRecord, ReindexResponse, ScanResponse, UpdateResponse,
        UpdatedFields, STATUS_DELETED, STATUS_REINDEXED, STATUS_SAVED, STATUS_UPDATED,
    },
};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::{error::SyncError, types::Operation, MemoryApi, ScanRequest};

pub(crate) fn record(id: i64, location: Option<&str>, tags: Option<&[&str]>) -> MemoryRecord {
    MemoryRecord {
        id: MemoryId::from(id),
        image_url: format!("https://cdn.example/{id}.jpg"),
        tags: tags.map(|tags| tags.iter().map(|tag| tag.to_string()).collect()),
        location: location.map(str::to_string),
        score: None,
        created_at: None,
    }
}

pub(crate) fn scored(id: i64, location: &str, score: f64) -> MemoryRecord {
    MemoryRecord {
        score: Some(score),
        ..record(id, Some(location), Some(&[]))
    }
}

pub(crate) struct FakeMemoryApi {
    pub listing: Mutex<Vec<MemoryRecord>>,
    pub fail_listing: Mutex<Option<SyncError>>,
    pub search_results: Mutex<HashMap<String, Vec<MemoryRecord>>>,
    /// Searches for these queries wait until the paired sender fires.
    pub search_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    pub list_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub scan_status: Mutex<String>,
    pub scan_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub update_status: Mutex<String>,
    pub update_omits_data: Mutex<bool>,
    pub delete_status: Mutex<String>,
    pub delete_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub calls: Mutex<Vec<String>>,
    call_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl FakeMemoryApi {
    pub fn new() -> Self {
        Self {
            listing: Mutex::new(Vec::new()),
            fail_listing: Mutex::new(None),
            search_results: Mutex::new(HashMap::new()),
            search_gates: Mutex::new(HashMap::new()),
            list_gate: Mutex::new(None),
            scan_status: Mutex::new(STATUS_SAVED.to_string()),
            scan_gate: Mutex::new(None),
            update_status: Mutex::new(STATUS_UPDATED.to_string()),
            update_omits_data: Mutex::new(false),
            delete_status: Mutex::new(STATUS_DELETED.to_string()),
            delete_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            call_tx: Mutex::new(None),
        }
    }

    pub fn with_listing(listing: Vec<MemoryRecord>) -> Self {
        let api = Self::new();
        *api.listing.try_lock().expect("fresh fake") = listing;
        api
    }

    /// Reports every call as it starts, before any gate is awaited.
    pub async fn watch_calls(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.call_tx.lock().await = Some(tx);
        rx
    }

    pub async fn gate_search(&self, query: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.search_gates.lock().await.insert(query.to_string(), rx);
        tx
    }

    pub async fn gate_listing(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.list_gate.lock().await = Some(rx);
        tx
    }

    pub async fn gate_scan(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.scan_gate.lock().await = Some(rx);
        tx
    }

    pub async fn gate_delete(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.delete_gate.lock().await = Some(rx);
        tx
    }

    pub async fn call_log(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record_call(&self, call: String) {
        self.calls.lock().await.push(call.clone());
        if let Some(tx) = self.call_tx.lock().await.as_ref() {
            let _ = tx.send(call);
        }
    }
}

fn normalize_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[async_trait]
impl MemoryApi for FakeMemoryApi {
    async fn list_memories(&self, user_id: &UserId) -> Result<Vec<MemoryRecord>, SyncError> {
        self.record_call(format!("list:{user_id}")).await;
        let gate = self.list_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = self.fail_listing.lock().await.take() {
            return Err(err);
        }
        Ok(self.listing.lock().await.clone())
    }

    async fn search_memories(
        &self,
        query: &str,
        _user_id: &UserId,
    ) -> Result<Vec<MemoryRecord>, SyncError> {
        self.record_call(format!("search:{query}")).await;
        let gate = self.search_gates.lock().await.remove(query);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self
            .search_results
            .lock()
            .await
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, SyncError> {
        self.record_call(format!("scan:{}", request.location)).await;
        let gate = self.scan_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let status = self.scan_status.lock().await.clone();
        if status != STATUS_SAVED {
            return Ok(ScanResponse {
                status,
                tags: Vec::new(),
                url: None,
                error: Some("storage bucket unavailable".to_string()),
            });
        }

        let mut listing = self.listing.lock().await;
        let id = listing.len() as i64 + 100;
        let tags = normalize_tags(&request.manual_tags);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        listing.push(record(id, Some(&request.location), Some(&tag_refs)));
        Ok(ScanResponse {
            status,
            tags,
            url: Some(format!("https://cdn.example/{id}.jpg")),
            error: None,
        })
    }

    async fn update_memory(
        &self,
        id: &MemoryId,
        location: &str,
        manual_tags: &str,
    ) -> Result<UpdateResponse, SyncError> {
        self.record_call(format!("update:{id}")).await;
        let status = self.update_status.lock().await.clone();
        let data = if *self.update_omits_data.lock().await {
            None
        } else {
            Some(UpdatedFields {
                tags: Some(normalize_tags(manual_tags)),
                location: None,
            })
        };
        let _ = location;
        Ok(UpdateResponse {
            status,
            data,
            error: None,
        })
    }

    async fn delete_memory(&self, id: &MemoryId) -> Result<DeleteResponse, SyncError> {
        self.record_call(format!("delete:{id}")).await;
        let gate = self.delete_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let status = self.delete_status.lock().await.clone();
        if status == STATUS_DELETED {
            self.listing.lock().await.retain(|record| &record.id != id);
        }
        Ok(DeleteResponse {
            status,
            error: None,
        })
    }

    async fn reindex(&self) -> Result<ReindexResponse, SyncError> {
        self.record_call("reindex".to_string()).await;
        Ok(ReindexResponse {
            status: STATUS_REINDEXED.to_string(),
            updated: 3,
            error: None,
        })
    }
}

pub(crate) fn transport_failure(operation: Operation) -> SyncError {
    SyncError::transport(operation, "connection refused")
}
