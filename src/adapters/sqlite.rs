//! SQLite persistence for todos and file metadata.
//!
//! All statements run on the single executor thread owned by
//! [`tokio_rusqlite::Connection`]; callers only await the result.
//! Timestamps are stored as fixed-width RFC 3339 UTC text (nanosecond
//! precision) so lexical order equals chronological order.

use crate::domain::model::{FileRecord, Page, SortOrder, TodoItem};
use crate::domain::ports::{FileRepository, TodoRepository};
use crate::utils::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;
use tokio_rusqlite::Connection;
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS todos (
        id          TEXT PRIMARY KEY NOT NULL,
        description TEXT NOT NULL,
        due_date    TEXT NOT NULL,
        file_id     TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos (created_at);

    CREATE TABLE IF NOT EXISTS files (
        id           TEXT PRIMARY KEY NOT NULL,
        filename     TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size         INTEGER NOT NULL,
        storage_key  TEXT NOT NULL UNIQUE,
        url          TEXT,
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_files_created_at ON files (created_at);
";

fn encode_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn order_clause(order: SortOrder) -> &'static str {
    match order {
        SortOrder::CreatedAtDesc => "ORDER BY created_at DESC, rowid DESC",
    }
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<TodoItem> {
    Ok(TodoItem {
        id: decode_uuid(row, 0)?,
        description: row.get(1)?,
        due_date: decode_time(row, 2)?,
        file_id: row.get(3)?,
        created_at: decode_time(row, 4)?,
        updated_at: decode_time(row, 5)?,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let size: i64 = row.get(3)?;
    Ok(FileRecord {
        id: decode_uuid(row, 0)?,
        filename: row.get(1)?,
        content_type: row.get(2)?,
        size: size.max(0) as u64,
        storage_key: row.get(4)?,
        url: row.get(5)?,
        created_at: decode_time(row, 6)?,
        updated_at: decode_time(row, 7)?,
    })
}

/// Handle to the database; cheap to clone.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Opens (creating if needed) the database at `path`. `":memory:"` opens
    /// a private in-memory database.
    pub async fn open(path: &str) -> Result<Self, RepositoryError> {
        if path == ":memory:" {
            return Self::open_in_memory().await;
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RepositoryError::Connection(e.to_string()))?;
            }
        }

        tracing::info!(path = %path, "opening sqlite database");
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Self::initialize(conn, true).await
    }

    pub async fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Self::initialize(conn, false).await
    }

    async fn initialize(conn: Connection, wal: bool) -> Result<Self, RepositoryError> {
        conn.call(move |conn| {
            if wal {
                conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
            }
            conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub fn todos(&self) -> SqliteTodoRepository {
        SqliteTodoRepository {
            conn: self.conn.clone(),
        }
    }

    pub fn files(&self) -> SqliteFileRepository {
        SqliteFileRepository {
            conn: self.conn.clone(),
        }
    }
}

pub struct SqliteTodoRepository {
    conn: Connection,
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn create(&self, todo: &TodoItem) -> Result<(), RepositoryError> {
        let todo = todo.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO todos (id, description, due_date, file_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        todo.id.to_string(),
                        todo.description,
                        encode_time(&todo.due_date),
                        todo.file_id,
                        encode_time(&todo.created_at),
                        encode_time(&todo.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<TodoItem>, RepositoryError> {
        let found = self
            .conn
            .call(move |conn| {
                let todo = conn
                    .query_row(
                        "SELECT id, description, due_date, file_id, created_at, updated_at
                         FROM todos WHERE id = ?1",
                        params![id.to_string()],
                        todo_from_row,
                    )
                    .optional()?;
                Ok(todo)
            })
            .await?;
        Ok(found)
    }

    async fn list(&self, page: Page) -> Result<Vec<TodoItem>, RepositoryError> {
        let todos = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT id, description, due_date, file_id, created_at, updated_at
                     FROM todos {} LIMIT ?1 OFFSET ?2",
                    order_clause(page.order)
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![page.limit as i64, page.offset as i64], todo_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(todos)
    }

    async fn update(&self, todo: &TodoItem) -> Result<(), RepositoryError> {
        let todo = todo.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE todos
                     SET description = ?1, due_date = ?2, file_id = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![
                        todo.description,
                        encode_time(&todo.due_date),
                        todo.file_id,
                        encode_time(&todo.updated_at),
                        todo.id.to_string(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM todos WHERE id = ?1", params![id.to_string()])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

pub struct SqliteFileRepository {
    conn: Connection,
}

#[async_trait]
impl FileRepository for SqliteFileRepository {
    async fn create(&self, file: &FileRecord) -> Result<(), RepositoryError> {
        let file = file.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO files (id, filename, content_type, size, storage_key, url, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        file.id.to_string(),
                        file.filename,
                        file.content_type,
                        file.size as i64,
                        file.storage_key,
                        file.url,
                        encode_time(&file.created_at),
                        encode_time(&file.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, RepositoryError> {
        let found = self
            .conn
            .call(move |conn| {
                let file = conn
                    .query_row(
                        "SELECT id, filename, content_type, size, storage_key, url, created_at, updated_at
                         FROM files WHERE id = ?1",
                        params![id.to_string()],
                        file_from_row,
                    )
                    .optional()?;
                Ok(file)
            })
            .await?;
        Ok(found)
    }

    async fn list(&self, page: Page) -> Result<Vec<FileRecord>, RepositoryError> {
        let files = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT id, filename, content_type, size, storage_key, url, created_at, updated_at
                     FROM files {} LIMIT ?1 OFFSET ?2",
                    order_clause(page.order)
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![page.limit as i64, page.offset as i64], file_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(files)
    }

    async fn update(&self, file: &FileRecord) -> Result<(), RepositoryError> {
        let file = file.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE files SET filename = ?1, content_type = ?2, updated_at = ?3 WHERE id = ?4",
                    params![
                        file.filename,
                        file.content_type,
                        encode_time(&file.updated_at),
                        file.id.to_string(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM files WHERE id = ?1", params![id.to_string()])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn todo_at(description: &str, created_at: DateTime<Utc>) -> TodoItem {
        TodoItem {
            id: Uuid::new_v4(),
            description: description.to_string(),
            due_date: created_at + Duration::days(2),
            file_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn todo_round_trips_exactly() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let repo = db.todos();
        let mut todo = todo_at("buy milk", Utc::now());
        todo.file_id = Some("abc.png".to_string());

        repo.create(&todo).await.unwrap();
        let loaded = repo.get_by_id(todo.id).await.unwrap();
        assert_eq!(loaded, Some(todo));
    }

    #[tokio::test]
    async fn missing_todo_is_none() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        assert!(db.todos().get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_windowed() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let repo = db.todos();
        let base = Utc::now();
        for i in 0..4 {
            repo.create(&todo_at(&format!("todo {i}"), base + Duration::milliseconds(i)))
                .await
                .unwrap();
        }

        let all = repo.list(Page::normalized(10, 0)).await.unwrap();
        let names: Vec<_> = all.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["todo 3", "todo 2", "todo 1", "todo 0"]);

        let window = repo.list(Page::normalized(2, 1)).await.unwrap();
        let names: Vec<_> = window.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["todo 2", "todo 1"]);
    }

    #[tokio::test]
    async fn update_can_clear_file_id() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let repo = db.todos();
        let mut todo = todo_at("with file", Utc::now());
        todo.file_id = Some("doc.pdf".to_string());
        repo.create(&todo).await.unwrap();

        todo.file_id = None;
        todo.updated_at = todo.updated_at + Duration::seconds(1);
        repo.update(&todo).await.unwrap();

        assert_eq!(repo.get_by_id(todo.id).await.unwrap(), Some(todo));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let repo = db.todos();
        let todo = todo_at("gone", Utc::now());
        repo.create(&todo).await.unwrap();

        repo.delete(todo.id).await.unwrap();
        assert!(repo.get_by_id(todo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_an_error() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let repo = db.todos();
        let todo = todo_at("once", Utc::now());
        repo.create(&todo).await.unwrap();

        assert!(repo.create(&todo).await.is_err());
    }

    #[tokio::test]
    async fn file_metadata_round_trips() {
        let db = SqliteDatabase::open_in_memory().await.unwrap();
        let repo = db.files();
        let now = Utc::now();
        let mut file = FileRecord {
            id: Uuid::new_v4(),
            filename: "photo.png".to_string(),
            content_type: "image/png".to_string(),
            size: 2048,
            storage_key: format!("{}.png", Uuid::new_v4()),
            url: None,
            created_at: now,
            updated_at: now,
        };
        repo.create(&file).await.unwrap();
        assert_eq!(repo.get_by_id(file.id).await.unwrap(), Some(file.clone()));

        file.filename = "renamed.png".to_string();
        repo.update(&file).await.unwrap();
        let listed = repo.list(Page::default()).await.unwrap();
        assert_eq!(listed, vec![file.clone()]);

        repo.delete(file.id).await.unwrap();
        assert!(repo.get_by_id(file.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn opens_file_database_in_nested_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("taskflow.db");

        let db = SqliteDatabase::open(path.to_str().unwrap()).await.unwrap();
        db.todos().create(&todo_at("persisted", Utc::now())).await.unwrap();

        let reopened = SqliteDatabase::open(path.to_str().unwrap()).await.unwrap();
        assert_eq!(reopened.todos().list(Page::default()).await.unwrap().len(), 1);
    }
}
