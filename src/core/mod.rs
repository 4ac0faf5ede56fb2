pub mod dispatch;
pub mod file_service;
pub mod todo_service;

pub use crate::domain::model::{CreateTodoRequest, Page, TodoItem, UpdateTodoRequest};
pub use crate::domain::ports::{EventPublisher, FileRepository, ObjectStore, TodoRepository};
pub use crate::utils::error::Result;
pub use dispatch::EventDispatcher;
pub use file_service::{FileService, UploadPolicy};
pub use todo_service::TodoService;
