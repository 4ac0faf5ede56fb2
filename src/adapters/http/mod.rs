//! Axum router exposing the todo and file services over HTTP/JSON.

pub mod error;
pub mod file_handlers;
pub mod todo_handlers;

use crate::core::{FileService, TodoService};
use crate::domain::model::{Page, DEFAULT_PAGE_LIMIT};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub todos: Arc<TodoService>,
    pub files: Arc<FileService>,
}

impl AppState {
    pub fn new(todos: TodoService, files: FileService) -> Self {
        Self {
            todos: Arc::new(todos),
            files: Arc::new(files),
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let upload_limit = usize::try_from(state.files.policy().max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health))
        .route(
            "/todo",
            get(todo_handlers::list_todos).post(todo_handlers::create_todo),
        )
        .route(
            "/todo/{id}",
            get(todo_handlers::get_todo)
                .put(todo_handlers::update_todo)
                .delete(todo_handlers::delete_todo),
        )
        .route(
            "/upload",
            post(file_handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files", get(file_handlers::list_files))
        .route(
            "/files/{id}",
            get(file_handlers::get_file)
                .put(file_handlers::update_file)
                .delete(file_handlers::delete_file),
        )
        .route("/files/{id}/download", get(file_handlers::download_file))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::invalid_uuid())
}

/// `limit`/`offset` query parameters. Unparseable values fall back to the
/// defaults instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> Page {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(|v| v.trim().parse::<i64>().ok());
        Page::normalized(
            parse(&self.limit).unwrap_or(DEFAULT_PAGE_LIMIT),
            parse(&self.offset).unwrap_or(0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
}

impl Pagination {
    pub fn new(page: Page, count: usize) -> Self {
        Self {
            limit: page.limit,
            offset: page.offset,
            count,
        }
    }
}
