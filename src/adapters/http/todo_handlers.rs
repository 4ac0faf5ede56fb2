use super::error::ApiError;
use super::{parse_id, ListParams, Pagination};
use super::AppState;
use crate::domain::model::{CreateTodoRequest, TodoItem, UpdateTodoRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<TodoItem>,
    pub pagination: Pagination,
}

pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoItem>), ApiError> {
    let Json(req) = payload?;
    let todo = state
        .todos
        .create_todo(req)
        .await
        .map_err(|e| ApiError::service(e, "Failed to create todo"))?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoItem>, ApiError> {
    let id = parse_id(&id)?;
    let todo = state
        .todos
        .get_todo(id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to retrieve todo"))?;
    Ok(Json(todo))
}

pub async fn list_todos(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TodoListResponse>, ApiError> {
    let page = params.page();
    let todos = state
        .todos
        .list_todos(page.limit as i64, page.offset as i64)
        .await
        .map_err(|e| ApiError::service(e, "Failed to retrieve todos"))?;

    Ok(Json(TodoListResponse {
        pagination: Pagination::new(page, todos.len()),
        todos,
    }))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoItem>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;
    let todo = state
        .todos
        .update_todo(id, req)
        .await
        .map_err(|e| ApiError::service(e, "Failed to update todo"))?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state
        .todos
        .delete_todo(id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to delete todo"))?;
    Ok(StatusCode::NO_CONTENT)
}
