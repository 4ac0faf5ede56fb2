use crate::domain::model::{FileRecord, NewFileUpload, Page, UpdateFileRequest};
use crate::domain::ports::{FileRepository, ObjectStore};
use crate::utils::error::{Result, StorageError, TaskflowError};
use crate::utils::validation::file_extension;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "txt", "pdf", "doc", "docx"];

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    /// Lower-case, without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    fn check(&self, upload: &NewFileUpload) -> Result<String> {
        if upload.filename.trim().is_empty() {
            return Err(TaskflowError::validation("filename is required"));
        }

        let extension = file_extension(&upload.filename)
            .filter(|ext| self.allowed_extensions.iter().any(|allowed| allowed == ext))
            .ok_or_else(|| TaskflowError::validation("file type not allowed"))?;

        if upload.content.is_empty() {
            return Err(TaskflowError::validation("file is empty"));
        }
        if upload.content.len() as u64 > self.max_bytes {
            return Err(TaskflowError::validation("file too large"));
        }

        Ok(extension)
    }
}

/// Uploads blobs to the object store and keeps their metadata relationally.
pub struct FileService {
    files: Arc<dyn FileRepository>,
    objects: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
}

impl FileService {
    pub fn new(files: Arc<dyn FileRepository>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            files,
            objects,
            policy: UploadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    async fn find_existing(&self, id: Uuid) -> Result<FileRecord> {
        self.files
            .get_by_id(id)
            .await
            .map_err(|e| TaskflowError::persistence("get file", e))?
            .ok_or_else(|| TaskflowError::not_found("file", id))
    }

    pub async fn upload_file(&self, upload: NewFileUpload) -> Result<FileRecord> {
        let extension = self.policy.check(&upload)?;
        let storage_key = format!("{}.{}", Uuid::new_v4(), extension);
        let size = upload.content.len() as u64;

        self.objects
            .put(&storage_key, upload.content, &upload.content_type)
            .await
            .map_err(|e| TaskflowError::object_store("store upload", e))?;

        let now = Utc::now();
        let record = FileRecord {
            id: Uuid::new_v4(),
            filename: upload.filename,
            content_type: upload.content_type,
            size,
            url: self.objects.url(&storage_key),
            storage_key,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.files.create(&record).await {
            tracing::error!(file_id = %record.id, error = %e, "failed to save file metadata, removing object");
            if let Err(cleanup) = self.objects.delete(&record.storage_key).await {
                tracing::warn!(storage_key = %record.storage_key, error = %cleanup, "orphaned object left in storage");
            }
            return Err(TaskflowError::persistence("create file", e));
        }

        tracing::info!(
            file_id = %record.id,
            filename = %record.filename,
            size = record.size,
            "file uploaded"
        );
        Ok(record)
    }

    pub async fn get_file(&self, id: Uuid) -> Result<FileRecord> {
        self.find_existing(id).await
    }

    pub async fn list_files(&self, limit: i64, offset: i64) -> Result<Vec<FileRecord>> {
        self.files
            .list(Page::normalized(limit, offset))
            .await
            .map_err(|e| TaskflowError::persistence("list files", e))
    }

    pub async fn update_file(&self, id: Uuid, req: UpdateFileRequest) -> Result<FileRecord> {
        let mut record = self.find_existing(id).await?;

        if let Some(filename) = req.filename {
            record.filename = filename;
        }
        if let Some(content_type) = req.content_type {
            record.content_type = content_type;
        }
        record.updated_at = Utc::now().max(record.updated_at);

        self.files
            .update(&record)
            .await
            .map_err(|e| TaskflowError::persistence("update file", e))?;

        tracing::info!(file_id = %id, "file metadata updated");
        Ok(record)
    }

    pub async fn download_file(&self, id: Uuid) -> Result<(FileRecord, Bytes)> {
        let record = self.find_existing(id).await?;

        let content = match self.objects.get(&record.storage_key).await {
            Ok(content) => content,
            Err(StorageError::NotFound { .. }) => {
                tracing::warn!(file_id = %id, storage_key = %record.storage_key, "metadata points at a missing object");
                return Err(TaskflowError::not_found("file content", id));
            }
            Err(e) => return Err(TaskflowError::object_store("read upload", e)),
        };

        Ok((record, content))
    }

    pub async fn delete_file(&self, id: Uuid) -> Result<()> {
        let record = self.find_existing(id).await?;

        match self.objects.delete(&record.storage_key).await {
            Ok(()) | Err(StorageError::NotFound { .. }) => {}
            Err(e) => return Err(TaskflowError::object_store("delete upload", e)),
        }

        self.files
            .delete(id)
            .await
            .map_err(|e| TaskflowError::persistence("delete file", e))?;

        tracing::info!(file_id = %id, "file deleted");
        Ok(())
    }
}
