use std::{fmt, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{domain::MemoryId, protocol::MemoryRecord};

/// Location shown for records stored without one.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// A memory as held by the item store. Always fully shaped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: MemoryId,
    pub image: String,
    pub tags: Vec<String>,
    pub location: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<MemoryRecord> for Item {
    fn from(record: MemoryRecord) -> Self {
        let location = record
            .location
            .filter(|location| !location.is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
        Self {
            id: record.id,
            image: record.image_url,
            tags: record.tags.unwrap_or_default(),
            location,
            score: record.score.unwrap_or(0.0),
            created_at: record.created_at,
        }
    }
}

/// A photograph selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, bytes))
    }
}

/// Fields submitted when creating a memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub file: Option<ImageUpload>,
    pub location: String,
    /// Comma separated; normalized server side.
    pub tags: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    Search,
    Create,
    Update,
    Delete,
    Reindex,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Search => "search",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Reindex => "reindex",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies an outstanding write; at most one per key may be in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WriteKey {
    Create,
    Update(MemoryId),
    Delete(MemoryId),
}

impl WriteKey {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create => Operation::Create,
            Self::Update(_) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }

    pub fn target(&self) -> String {
        match self {
            Self::Create => "new memory".to_string(),
            Self::Update(id) | Self::Delete(id) => format!("memory {id}"),
        }
    }
}

/// What the item store currently projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreContents {
    #[default]
    Listing,
    SearchResults { query: String },
}

/// Result of a list or search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Applied { items: usize },
    /// A newer read was issued before this response arrived.
    Superseded,
}

/// Result of an update whose confirmation arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Applied(Item),
    /// Confirmed remotely, but the item is no longer in the store.
    NotInView,
}

/// Result of a delete confirmed by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    AlreadyAbsent,
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedMemory {
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}
