//! In-process implementations of every port.
//!
//! Used by the `memory` storage backend and by tests. State lives behind
//! tokio locks so the adapters can be shared across tasks like the real ones.

use crate::domain::model::{FileRecord, Page, SortOrder, TodoItem};
use crate::domain::ports::{EventPublisher, FileRepository, ObjectStore, TodoRepository};
use crate::utils::error::{PublishError, RepositoryError, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

fn paginate<T: Clone>(rows: &[T], page: Page, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    // Rows are kept in insertion order; reversing first makes ties newest-first.
    let mut sorted: Vec<T> = rows.iter().rev().cloned().collect();
    match page.order {
        SortOrder::CreatedAtDesc => sorted.sort_by(|a, b| created_at(b).cmp(&created_at(a))),
    }
    sorted.into_iter().skip(page.offset).take(page.limit).collect()
}

#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    rows: RwLock<Vec<TodoItem>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn create(&self, todo: &TodoItem) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id == todo.id) {
            return Err(RepositoryError::Backend(format!("duplicate todo id {}", todo.id)));
        }
        rows.push(todo.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<TodoItem>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<TodoItem>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(paginate(&rows, page, |todo| todo.created_at))
    }

    async fn update(&self, todo: &TodoItem) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows.iter_mut().find(|row| row.id == todo.id) {
            *row = todo.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows.write().await.retain(|row| row.id != id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFileRepository {
    rows: RwLock<Vec<FileRecord>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, file: &FileRecord) -> Result<(), RepositoryError> {
        self.rows.write().await.push(file.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<FileRecord>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(paginate(&rows, page, |file| file.created_at))
    }

    async fn update(&self, file: &FileRecord) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows.iter_mut().find(|row| row.id == file.id) {
            *row = file.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows.write().await.retain(|row| row.id != id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, (Bytes, String)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (content, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

/// A published event as seen by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Publisher that keeps every event it is handed. Can be switched into a
/// failing mode to exercise error paths.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PublishedEvent>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.fail.store(true, Ordering::SeqCst);
        publisher
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Backend("publisher unavailable".to_string()));
        }
        if let Ok(mut events) = self.events.lock() {
            events.push(PublishedEvent {
                topic: topic.to_string(),
                payload: payload.clone(),
            });
        }
        Ok(())
    }
}
