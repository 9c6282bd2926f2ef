//! reqwest implementation of [`MemoryApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{MemoryId, UserId},
    protocol::{DeleteResponse, MemoryRecord, ReindexResponse, ScanResponse, UpdateResponse},
};
use tracing::debug;

use crate::{
    error::SyncError,
    types::{ImageUpload, Operation},
    MemoryApi, ScanRequest,
};

const DEFAULT_UPLOAD_MIME: &str = "application/octet-stream";

pub struct HttpMemoryApi {
    http: Client,
    server_url: String,
}

impl HttpMemoryApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_timeout(server_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::transport(Operation::Fetch, err))?;
        Ok(Self::with_client(http, server_url))
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.server_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = request
            .send()
            .await
            .map_err(|err| SyncError::transport(operation, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                operation,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| SyncError::contract(operation, format!("malformed body: {err}")))
    }
}

fn image_part(file: ImageUpload) -> Result<Part, SyncError> {
    let mime = file
        .mime_type
        .clone()
        .unwrap_or_else(|| DEFAULT_UPLOAD_MIME.to_string());
    Part::bytes(file.bytes)
        .file_name(file.filename)
        .mime_str(&mime)
        .map_err(|_| SyncError::Validation(format!("unsupported image type '{mime}'")))
}

#[async_trait]
impl MemoryApi for HttpMemoryApi {
    async fn list_memories(&self, user_id: &UserId) -> Result<Vec<MemoryRecord>, SyncError> {
        debug!(user_id = %user_id, "GET memories");
        let request = self
            .http
            .get(self.endpoint("memories"))
            .query(&[("user_id", user_id.as_str())]);
        self.execute(Operation::Fetch, request).await
    }

    async fn search_memories(
        &self,
        query: &str,
        user_id: &UserId,
    ) -> Result<Vec<MemoryRecord>, SyncError> {
        debug!(user_id = %user_id, query, "GET search");
        let request = self
            .http
            .get(self.endpoint("search"))
            .query(&[("q", query), ("user_id", user_id.as_str())]);
        self.execute(Operation::Search, request).await
    }

    async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, SyncError> {
        let ScanRequest {
            file,
            user_id,
            location,
            manual_tags,
        } = request;
        debug!(user_id = %user_id, filename = %file.filename, bytes = file.bytes.len(), "POST scan");
        let form = Form::new()
            .part("file", image_part(file)?)
            .text("user_id", user_id.to_string())
            .text("location", location)
            .text("manual_tags", manual_tags);
        let request = self.http.post(self.endpoint("scan")).multipart(form);
        self.execute(Operation::Create, request).await
    }

    async fn update_memory(
        &self,
        id: &MemoryId,
        location: &str,
        manual_tags: &str,
    ) -> Result<UpdateResponse, SyncError> {
        debug!(memory_id = %id, "PUT memory");
        let form = Form::new()
            .text("location", location.to_string())
            .text("manual_tags", manual_tags.to_string());
        let request = self
            .http
            .put(self.endpoint(&format!("memories/{id}")))
            .multipart(form);
        self.execute(Operation::Update, request).await
    }

    async fn delete_memory(&self, id: &MemoryId) -> Result<DeleteResponse, SyncError> {
        debug!(memory_id = %id, "DELETE memory");
        let request = self.http.delete(self.endpoint(&format!("memories/{id}")));
        self.execute(Operation::Delete, request).await
    }

    async fn reindex(&self) -> Result<ReindexResponse, SyncError> {
        let request = self.http.post(self.endpoint("reindex"));
        self.execute(Operation::Reindex, request).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
