use crate::domain::model::{FileRecord, Page, TodoItem};
use crate::utils::error::{PublishError, RepositoryError, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

/// Relational store for todo records.
///
/// `get_by_id` reports a miss as `Ok(None)` so callers can tell it apart
/// from a store failure. `list` must honour `page.order`.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn create(&self, todo: &TodoItem) -> Result<(), RepositoryError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<TodoItem>, RepositoryError>;
    async fn list(&self, page: Page) -> Result<Vec<TodoItem>, RepositoryError>;
    async fn update(&self, todo: &TodoItem) -> Result<(), RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Fire-and-forget event sink. Nothing is acknowledged back to the caller
/// beyond the single attempt's outcome.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), PublishError>;
}

/// Metadata store for uploaded files.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, file: &FileRecord) -> Result<(), RepositoryError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, RepositoryError>;
    async fn list(&self, page: Page) -> Result<Vec<FileRecord>, RepositoryError>;
    async fn update(&self, file: &FileRecord) -> Result<(), RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Blob storage addressed by opaque keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public location of the object, when the backend has one.
    fn url(&self, _key: &str) -> Option<String> {
        None
    }
}
