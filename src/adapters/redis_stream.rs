//! Redis Streams publisher.
//!
//! Each event becomes one `XADD <prefix><topic> * payload <json>` entry.

use crate::domain::ports::EventPublisher;
use crate::utils::error::PublishError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

pub const PAYLOAD_FIELD: &str = "payload";

pub struct RedisStreamPublisher {
    conn: MultiplexedConnection,
    stream_prefix: String,
}

impl RedisStreamPublisher {
    /// Connects eagerly so a bad URL fails at startup, not on first publish.
    pub async fn connect(redis_url: &str, stream_prefix: &str) -> Result<Self, PublishError> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!(url = %redis_url, prefix = %stream_prefix, "connected to redis");

        Ok(Self {
            conn,
            stream_prefix: stream_prefix.to_string(),
        })
    }

    pub fn stream_key(&self, topic: &str) -> String {
        stream_key(&self.stream_prefix, topic)
    }
}

fn stream_key(prefix: &str, topic: &str) -> String {
    format!("{prefix}{topic}")
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        let body = serde_json::to_string(payload)?;
        let key = self.stream_key(topic);

        // The multiplexed connection is a cheap handle onto one socket.
        let mut conn = self.conn.clone();
        let entry_id: String = conn.xadd(&key, "*", &[(PAYLOAD_FIELD, body)]).await?;

        tracing::debug!(stream = %key, entry_id = %entry_id, "appended stream entry");
        Ok(())
    }
}

/// Stand-in used when no broker is configured: the event is only logged.
#[derive(Debug, Default)]
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        tracing::info!(topic = %topic, payload = %payload, "event (no broker configured)");
        Ok(())
    }
}
