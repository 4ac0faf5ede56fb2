use crate::core::dispatch::{EventDispatcher, TODO_CREATED_TOPIC};
use crate::domain::model::{CreateTodoRequest, Page, TodoItem, UpdateTodoRequest};
use crate::domain::ports::TodoRepository;
use crate::utils::error::{RepositoryError, Result, TaskflowError};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;
use uuid::Uuid;

/// Validates todo requests, builds and mutates entities, persists them and
/// announces creations.
///
/// Holds no mutable state of its own; concurrent calls only meet inside the
/// repository and the dispatcher.
pub struct TodoService {
    todos: Arc<dyn TodoRepository>,
    events: EventDispatcher,
    store_timeout: Option<Duration>,
    span: Span,
}

impl TodoService {
    pub fn new(todos: Arc<dyn TodoRepository>, events: EventDispatcher) -> Self {
        Self {
            todos,
            events,
            store_timeout: None,
            span: tracing::info_span!("todo_service"),
        }
    }

    /// Bounds every repository call; an expired call fails with a
    /// persistence error.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Span every service event is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    async fn store<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = std::result::Result<T, RepositoryError>>,
    ) -> Result<T> {
        let outcome = match self.store_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(RepositoryError::Timeout(limit)),
            },
            None => call.await,
        };
        outcome.map_err(|e| TaskflowError::persistence(operation, e))
    }

    async fn find_existing(&self, id: Uuid) -> Result<TodoItem> {
        self.store("get todo", self.todos.get_by_id(id))
            .await?
            .ok_or_else(|| TaskflowError::not_found("todo", id))
    }

    pub async fn create_todo(&self, req: CreateTodoRequest) -> Result<TodoItem> {
        if req.description.is_empty() {
            return Err(TaskflowError::validation("description is required"));
        }

        let now = Utc::now();
        if req.due_date <= now {
            return Err(TaskflowError::validation("due date must be in the future"));
        }

        let todo = TodoItem {
            id: Uuid::new_v4(),
            description: req.description,
            due_date: req.due_date,
            file_id: req.file_id,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store("create todo", self.todos.create(&todo)).await {
            tracing::error!(parent: &self.span, todo_id = %todo.id, error = %e, "failed to create todo");
            return Err(e);
        }

        tracing::info!(
            parent: &self.span,
            todo_id = %todo.id,
            description = %todo.description,
            "todo created successfully"
        );

        self.events
            .dispatch(TODO_CREATED_TOPIC, &todo.id.to_string(), &todo, &self.span);

        Ok(todo)
    }

    pub async fn get_todo(&self, id: Uuid) -> Result<TodoItem> {
        match self.find_existing(id).await {
            Ok(todo) => {
                tracing::info!(parent: &self.span, todo_id = %id, "todo retrieved");
                Ok(todo)
            }
            Err(e) => {
                tracing::error!(parent: &self.span, todo_id = %id, error = %e, "failed to get todo");
                Err(e)
            }
        }
    }

    /// Newest first. `limit` and `offset` are normalized by [`Page::normalized`].
    pub async fn list_todos(&self, limit: i64, offset: i64) -> Result<Vec<TodoItem>> {
        let page = Page::normalized(limit, offset);

        let todos = self
            .store("list todos", self.todos.list(page))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    parent: &self.span,
                    limit = page.limit,
                    offset = page.offset,
                    error = %e,
                    "failed to list todos"
                )
            })?;

        tracing::info!(
            parent: &self.span,
            count = todos.len(),
            limit = page.limit,
            offset = page.offset,
            "todos listed"
        );
        Ok(todos)
    }

    /// Applies only the fields present in `req`. The due date is not checked
    /// against the clock here, only on creation.
    pub async fn update_todo(&self, id: Uuid, req: UpdateTodoRequest) -> Result<TodoItem> {
        let mut todo = self.find_existing(id).await?;

        if let Some(description) = req.description {
            todo.description = description;
        }
        if let Some(due_date) = req.due_date {
            todo.due_date = due_date;
        }
        if let Some(file_id) = req.file_id {
            todo.file_id = file_id;
        }

        // Clock skew must not move updated_at backwards; it already
        // dominates created_at.
        todo.updated_at = Utc::now().max(todo.updated_at);

        if let Err(e) = self.store("update todo", self.todos.update(&todo)).await {
            tracing::error!(parent: &self.span, todo_id = %id, error = %e, "failed to update todo");
            return Err(e);
        }

        tracing::info!(parent: &self.span, todo_id = %id, "todo updated");
        Ok(todo)
    }

    pub async fn delete_todo(&self, id: Uuid) -> Result<()> {
        self.find_existing(id).await?;

        if let Err(e) = self.store("delete todo", self.todos.delete(id)).await {
            tracing::error!(parent: &self.span, todo_id = %id, error = %e, "failed to delete todo");
            return Err(e);
        }

        tracing::info!(parent: &self.span, todo_id = %id, "todo deleted");
        Ok(())
    }
}
