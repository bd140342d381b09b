//! 统一的错误处理模块
//!
//! Top-level error type that every module error converts into.

mod utils;

pub use utils::*;

pub use crate::embedding::EmbedderError;
pub use crate::language_models::LLMError;
pub use crate::memory::MemoryError;
pub use crate::vectorstore::VectorStoreError;

#[derive(thiserror::Error, Debug)]
pub enum LangChainError {
    #[error("LLM error: {0}")]
    LLMError(#[from] LLMError),

    #[error("Embedder error: {0}")]
    EmbedderError(#[from] EmbedderError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, LangChainError>;
