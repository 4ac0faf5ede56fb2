use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: Uuid,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub file_id: Option<String>,
}

/// Patch for an existing todo. A field left out of the request is `None`;
/// `file_id: Some(None)` is an explicit `"fileId": null` and clears the link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub file_id: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    CreatedAtDesc,
}

/// A normalized window over a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
    pub order: SortOrder,
}

impl Page {
    /// Out-of-range values are replaced, never rejected: a limit outside
    /// `1..=100` becomes 10 and a negative offset becomes 0.
    pub fn normalized(limit: i64, offset: i64) -> Self {
        let limit = if limit <= 0 || limit > MAX_PAGE_LIMIT {
            DEFAULT_PAGE_LIMIT
        } else {
            limit
        };
        let offset = offset.max(0);

        Self {
            limit: limit as usize,
            offset: offset as usize,
            order: SortOrder::CreatedAtDesc,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::normalized(DEFAULT_PAGE_LIMIT, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub storage_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFileUpload {
    pub filename: String,
    pub content_type: String,
    pub content: bytes::Bytes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
