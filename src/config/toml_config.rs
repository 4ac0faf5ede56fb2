use crate::core::file_service::{UploadPolicy, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};
use crate::utils::error::{Result, TaskflowError};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENVIRONMENTS: &[&str] = &["development", "staging", "production"];
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "development".to_string(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: String,
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/taskflow.db".to_string(),
            query_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub stream_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://localhost:6379".to_string(),
            stream_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
    pub s3: S3Config,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_path: "data/uploads".to_string(),
            s3: S3Config::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub region: String,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            bucket: "todo-files".to_string(),
            endpoint: None,
            access_key_id: "test".to_string(),
            secret_access_key: "test".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub max_upload_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl AppConfig {
    /// Loads a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| TaskflowError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML after replacing `${VAR}` with environment values. Unset
    /// variables are left as written.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content, |name| std::env::var(name).ok())?;

        toml::from_str(&processed).map_err(|e| TaskflowError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Applies the process environment on top of the loaded values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| TaskflowError::InvalidConfigValueError {
                    field: "PORT".to_string(),
                    value: port.clone(),
                    reason: "Must be a port number between 1 and 65535".to_string(),
                })?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.path = url
                .strip_prefix("sqlite://")
                .map(str::to_string)
                .unwrap_or(url);
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.redis.enabled = true;
            self.redis.url = if url.contains("://") {
                url
            } else {
                format!("redis://{url}")
            };
        }
        if let Some(environment) = lookup("ENVIRONMENT") {
            self.server.environment = environment;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level.to_ascii_lowercase();
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.storage.s3.region = region;
        }
        if let Some(bucket) = lookup("S3_BUCKET") {
            self.storage.s3.bucket = bucket;
        }
        if let Some(key) = lookup("AWS_ACCESS_KEY_ID") {
            self.storage.s3.access_key_id = key;
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.storage.s3.secret_access_key = secret;
        }
        if let Some(endpoint) = lookup("S3_ENDPOINT") {
            self.storage.s3.endpoint = Some(endpoint);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.database.query_timeout_secs)
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.logging.format).unwrap_or(LogFormat::Compact)
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.files.max_upload_bytes,
            allowed_extensions: self
                .files
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

fn substitute_env_vars(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TaskflowError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_range("server.port", self.server.port, 1, u16::MAX)?;
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_one_of("server.environment", &self.server.environment, ENVIRONMENTS)?;
        validation::validate_positive_number(
            "server.request_timeout_secs",
            self.server.request_timeout_secs,
            1,
        )?;
        validation::validate_positive_number(
            "server.shutdown_grace_secs",
            self.server.shutdown_grace_secs,
            1,
        )?;

        validation::validate_one_of("logging.level", &self.logging.level, LOG_LEVELS)?;
        if LogFormat::parse(&self.logging.format).is_none() {
            return Err(TaskflowError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: "Allowed values: compact, json".to_string(),
            });
        }

        validation::validate_path("database.path", &self.database.path)?;
        validation::validate_positive_number(
            "database.query_timeout_secs",
            self.database.query_timeout_secs,
            1,
        )?;

        if self.redis.enabled {
            validation::validate_url("redis.url", &self.redis.url, &["redis", "rediss"])?;
        }

        match self.storage.backend {
            StorageBackend::Local => {
                validation::validate_path("storage.local_path", &self.storage.local_path)?
            }
            StorageBackend::S3 => {
                let s3 = &self.storage.s3;
                validation::validate_s3_bucket_name("storage.s3.bucket", &s3.bucket)?;
                validation::validate_aws_region("storage.s3.region", &s3.region)?;
                if let Some(endpoint) = &s3.endpoint {
                    validation::validate_url("storage.s3.endpoint", endpoint, &["http", "https"])?;
                }
            }
            StorageBackend::Memory => {}
        }

        validation::validate_positive_number("files.max_upload_bytes", self.files.max_upload_bytes, 1)?;
        if self.files.allowed_extensions.is_empty() {
            return Err(TaskflowError::MissingConfigError {
                field: "files.allowed_extensions".to_string(),
            });
        }
        for ext in &self.files.allowed_extensions {
            validation::validate_non_empty_string("files.allowed_extensions", ext)?;
        }

        tracing::debug!("configuration validation passed");
        Ok(())
    }
}
