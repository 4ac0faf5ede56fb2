pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::AppConfig;

pub use core::{EventDispatcher, FileService, TodoService, UploadPolicy};
pub use domain::model::{CreateTodoRequest, TodoItem, UpdateTodoRequest};
pub use utils::error::{ErrorKind, Result, TaskflowError};
