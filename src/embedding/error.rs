use async_openai::error::OpenAIError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("Network request failed: {0}")]
    RequestError(#[from] ReqwestError),

    #[error("OpenAI error: {0}")]
    OpenAIError(#[from] OpenAIError),

    #[error("unexpected number of vectors: expected {expected}, got {got}")]
    WrongNumberOfVectors { expected: usize, got: usize },

    #[error("invalid embedder option: {0}")]
    InvalidOption(String),

    #[error("FastEmbed error: {0}")]
    FastEmbedError(String),

    #[error("Error: {0}")]
    OtherError(String),
}
