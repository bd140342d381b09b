use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("invalid input values: {0}")]
    InvalidInputValues(String),

    #[error("invalid message type: {0}")]
    InvalidMessageType(String),

    #[error("failed to count tokens: {0}")]
    TokenCountError(String),

    #[error("history file error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[cfg(feature = "sqlite-persistence")]
    #[error("sqlite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mongodb")]
    #[error("mongodb error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("memory error: {0}")]
    OtherError(String),
}
