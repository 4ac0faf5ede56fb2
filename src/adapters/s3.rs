use crate::config::S3Config;
use crate::domain::ports::ObjectStore;
use crate::utils::error::StorageError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base,
        }
    }

    /// Builds a client with static credentials and path-style addressing,
    /// which S3-compatible endpoints such as LocalStack and MinIO require.
    pub async fn from_config(cfg: &S3Config) -> Self {
        let credentials = Credentials::new(
            cfg.access_key_id.clone(),
            cfg.secret_access_key.clone(),
            None,
            None,
            "taskflow-config",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if let Some(endpoint) = &cfg.endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }
        let client = S3Client::from_conf(builder.build());

        let public_base = match &cfg.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), cfg.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", cfg.bucket, cfg.region),
        };

        tracing::info!(bucket = %cfg.bucket, region = %cfg.region, "S3 object store ready");
        Self::new(client, cfg.bucket.clone(), public_base)
    }
}

fn backend<E: ProvideErrorMetadata + std::fmt::Display>(e: E) -> StorageError {
    let code = e.code().unwrap_or("unknown").to_string();
    StorageError::Backend(format!("{code}: {e}"))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(content.to_vec()))
            .send()
            .await
            .map_err(|e| backend(e.into_service_error()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                GetObjectError::NoSuchKey(_) => StorageError::NotFound {
                    key: key.to_string(),
                },
                other => backend(other),
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to read S3 body: {e}")))?;

        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend(e.into_service_error()))?;
        Ok(())
    }

    fn url(&self, key: &str) -> Option<String> {
        Some(format!("{}/{}", self.public_base, key))
    }
}
