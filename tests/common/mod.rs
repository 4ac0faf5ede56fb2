#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::sync::Arc;
use taskflow::adapters::http::{self, AppState};
use taskflow::adapters::memory::{InMemoryObjectStore, RecordingPublisher};
use taskflow::adapters::sqlite::SqliteDatabase;
use taskflow::{CreateTodoRequest, EventDispatcher, FileService, TodoService};

pub struct TestApp {
    pub router: axum::Router,
    pub publisher: Arc<RecordingPublisher>,
    pub objects: Arc<InMemoryObjectStore>,
    pub dispatcher: EventDispatcher,
}

/// Full stack over an in-memory SQLite database, a recording publisher and
/// an in-memory object store.
pub async fn test_app() -> TestApp {
    let database = SqliteDatabase::open_in_memory().await.unwrap();
    let publisher = Arc::new(RecordingPublisher::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let dispatcher = EventDispatcher::new(publisher.clone());

    let todos = TodoService::new(Arc::new(database.todos()), dispatcher.clone());
    let files = FileService::new(Arc::new(database.files()), objects.clone());
    let router = http::router(
        AppState::new(todos, files),
        std::time::Duration::from_secs(5),
    );

    TestApp {
        router,
        publisher,
        objects,
        dispatcher,
    }
}

pub fn tomorrow_rfc3339() -> String {
    (Utc::now() + Duration::days(1)).to_rfc3339()
}

pub fn create_request(description: &str) -> CreateTodoRequest {
    CreateTodoRequest {
        description: description.to_string(),
        due_date: Utc::now() + Duration::days(1),
        file_id: None,
    }
}
