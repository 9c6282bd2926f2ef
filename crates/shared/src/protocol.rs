use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

use crate::domain::MemoryId;

/// Status literal returned by `POST /api/scan` when the memory was stored.
pub const STATUS_SAVED: &str = "saved";
/// Status literal returned by `PUT /api/memories/{id}` on success.
pub const STATUS_UPDATED: &str = "updated";
/// Status literal returned by `DELETE /api/memories/{id}` on success.
pub const STATUS_DELETED: &str = "deleted";
/// Status literal returned by `POST /api/reindex` on success.
pub const STATUS_REINDEXED: &str = "success";

/// A memory row as returned by the list and search endpoints.
///
/// Every field except `id` and `image_url` may be missing or null; the
/// client substitutes defaults before the record reaches the item store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub image_url: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    /// Unreadable timestamps decode as `None` instead of failing the record.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(IgnoredAny),
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(RawTimestamp::Text(raw)) => parse_timestamp(&raw),
        Some(RawTimestamp::Other(_)) | None => None,
    })
}

/// Accepts RFC 3339, Postgres `timestamptz` text and offset-less timestamps (read as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedFields {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<UpdatedFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexResponse {
    pub status: String,
    #[serde(default)]
    pub updated: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_record_tolerates_null_optional_fields() {
        let record: MemoryRecord = serde_json::from_str(
            r#"{"id":5,"image_url":"u","location":null,"tags":null,"score":null,"user_id":"x"}"#,
        )
        .expect("decode");
        assert_eq!(record.id, MemoryId::from(5));
        assert_eq!(record.location, None);
        assert_eq!(record.tags, None);
        assert_eq!(record.score, None);
    }

    #[test]
    fn created_at_without_offset_is_read_as_utc() {
        let records: Vec<MemoryRecord> = serde_json::from_str(
            r#"[{"id":1,"image_url":"u","created_at":"2024-05-01T10:00:00.123456"},
                {"id":2,"image_url":"v","created_at":"2024-05-01 10:00:00+00"},
                {"id":3,"image_url":"w","created_at":"2024-05-01T12:00:00+02:00"}]"#,
        )
        .expect("decode");
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(
            records[0].created_at.map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Some("2024-05-01 10:00:00".to_string())
        );
        assert_eq!(records[1].created_at, Some(expected));
        assert_eq!(records[2].created_at, Some(expected));
    }

    #[test]
    fn unreadable_created_at_does_not_fail_the_record() {
        let records: Vec<MemoryRecord> = serde_json::from_str(
            r#"[{"id":1,"image_url":"u","created_at":"yesterday"},
                {"id":2,"image_url":"v","created_at":1714557600},
                {"id":3,"image_url":"w","created_at":null}]"#,
        )
        .expect("decode");
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.created_at.is_none()));
    }

    #[test]
    fn update_response_without_data_still_decodes() {
        let response: UpdateResponse =
            serde_json::from_str(r#"{"status":"failed","error":"row not found"}"#).expect("decode");
        assert_eq!(response.status, "failed");
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("row not found"));
    }
}
