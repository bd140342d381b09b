use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{Deserialize, Serialize};

use crate::schemas::{Message, MessageType};

use super::{ChatMessageHistory, MemoryError};

pub const DEFAULT_KEY_PREFIX: &str = "message_store";
pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Serialize, Deserialize)]
struct RedisChatMessage {
    content: String,
    #[serde(rename = "type")]
    message_type: String,
}

/// Chat history stored as a Redis list of JSON messages under
/// `"{prefix}:{session}"`.
pub struct RedisChatMessageHistory {
    connection: MultiplexedConnection,
    prefix: String,
    session: String,
    ttl: Option<u64>,
}

impl RedisChatMessageHistory {
    /// Connects to `url` (e.g. `redis://127.0.0.1/`) for the given session.
    pub async fn new(url: &str, session: &str) -> Result<Self, MemoryError> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        log::debug!("connected to redis at {}", url);
        Ok(Self::from_connection(connection, session))
    }

    pub fn from_connection(connection: MultiplexedConnection, session: &str) -> Self {
        Self {
            connection,
            prefix: DEFAULT_KEY_PREFIX.into(),
            session: session.into(),
            ttl: None,
        }
    }

    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Expires the whole list `ttl` seconds after the last write.
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl).filter(|t| *t > 0);
        self
    }

    pub fn key(&self) -> String {
        redis_key(&self.prefix, &self.session)
    }
}

fn redis_key(prefix: &str, session: &str) -> String {
    format!("{}:{}", prefix, session)
}

fn encode(message: &Message) -> Result<String, MemoryError> {
    Ok(serde_json::to_string(&RedisChatMessage {
        content: message.content.clone(),
        message_type: message.message_type.as_str().into(),
    })?)
}

fn decode(raw: &str) -> Result<Message, MemoryError> {
    let stored: RedisChatMessage = serde_json::from_str(raw)?;
    let message_type = MessageType::from_type_str(&stored.message_type)
        .ok_or(MemoryError::InvalidMessageType(stored.message_type))?;
    Ok(Message {
        content: stored.content,
        message_type,
        ..Default::default()
    })
}

#[async_trait]
impl ChatMessageHistory for RedisChatMessageHistory {
    async fn messages(&self) -> Result<Vec<Message>, MemoryError> {
        let mut con = self.connection.clone();
        let raw: Vec<String> = con.lrange(self.key(), 0, -1).await?;
        raw.iter().map(|m| decode(m)).collect()
    }

    async fn add_message(&self, message: Message) -> Result<(), MemoryError> {
        let payload = encode(&message)?;
        let key = self.key();
        let mut con = self.connection.clone();
        con.rpush::<_, _, ()>(&key, payload).await?;
        if let Some(ttl) = self.ttl {
            con.expire::<_, ()>(&key, ttl as i64).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        let mut con = self.connection.clone();
        con.del::<_, ()>(self.key()).await?;
        Ok(())
    }
}
