use anyhow::Context;
use clap::Parser;
use std::future::Future;
use std::sync::Arc;
use taskflow::adapters::http::{self, AppState};
use taskflow::adapters::local_storage::LocalObjectStore;
use taskflow::adapters::memory::InMemoryObjectStore;
use taskflow::adapters::redis_stream::{LoggingPublisher, RedisStreamPublisher};
use taskflow::adapters::sqlite::SqliteDatabase;
use taskflow::config::{AppConfig, StorageBackend};
use taskflow::core::{EventDispatcher, EventPublisher, ObjectStore};
use taskflow::utils::{logger, validation::Validate};
use taskflow::{CliArgs, FileService, TaskflowError, TodoService};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = args.load_config().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    logger::init_logger(&config.logging.level, config.log_format());
    tracing::info!(
        environment = %config.server.environment,
        storage = ?config.storage.backend,
        redis = config.redis.enabled,
        "starting taskflow"
    );

    let database = SqliteDatabase::open(&config.database.path)
        .await
        .map_err(|e| TaskflowError::persistence("open database", e))?;

    let publisher = build_publisher(&config).await?;
    let objects = build_object_store(&config).await?;
    let dispatcher = EventDispatcher::new(publisher);

    let todos = TodoService::new(Arc::new(database.todos()), dispatcher.clone())
        .with_store_timeout(config.query_timeout())
        .with_span(tracing::info_span!("todo_service"));
    let files = FileService::new(Arc::new(database.files()), objects)
        .with_policy(config.upload_policy());

    let app = http::router(AppState::new(todos, files), config.request_timeout());

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!(address = %address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!(pending = dispatcher.pending(), "draining event dispatcher");
    dispatcher.shutdown(config.shutdown_grace()).await;
    tracing::info!("taskflow stopped");
    Ok(())
}

async fn build_publisher(config: &AppConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    if !config.redis.enabled {
        tracing::warn!("redis disabled, events will only be logged");
        return Ok(Arc::new(LoggingPublisher));
    }

    let publisher = RedisStreamPublisher::connect(&config.redis.url, &config.redis.stream_prefix)
        .await
        .context("connecting to redis")?;
    Ok(Arc::new(publisher))
}

async fn build_object_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.storage.backend {
        StorageBackend::Local => Ok(Arc::new(LocalObjectStore::new(&config.storage.local_path))),
        StorageBackend::Memory => Ok(Arc::new(InMemoryObjectStore::new())),
        #[cfg(feature = "s3")]
        StorageBackend::S3 => Ok(Arc::new(
            taskflow::adapters::s3::S3ObjectStore::from_config(&config.storage.s3).await,
        )),
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(TaskflowError::ConfigError {
            message: "storage.backend = \"s3\" requires the `s3` feature".to_string(),
        }
        .into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = wait_for_signal("ctrl-c", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = wait_for_signal("SIGTERM", async {
        let mut signal =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        signal.recv().await;
        Ok::<(), std::io::Error>(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

/// Resolves when `signal` fires. A listener that cannot be installed never
/// resolves, so it cannot stop the server on its own.
async fn wait_for_signal(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!(signal = name, error = %e, "failed to listen for signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_listener_does_not_trigger_shutdown() {
        let failing = async { Err::<(), _>(std::io::Error::other("signals unavailable")) };
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), wait_for_signal("test", failing)).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn delivered_signal_triggers_shutdown() {
        let delivered = async { Ok::<(), std::io::Error>(()) };
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), wait_for_signal("test", delivered)).await;
        assert!(outcome.is_ok());
    }
}
