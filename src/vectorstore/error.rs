use thiserror::Error;

use crate::embedding::EmbedderError;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("number of vectors ({vectors}) does not match number of documents ({documents})")]
    WrongNumberOfVectors { vectors: usize, documents: usize },

    #[error("missing text key in vector metadata")]
    MissingTextKey,

    #[error("empty response from vector store")]
    EmptyResponse,

    #[error("score threshold must be between 0 and 1")]
    InvalidScoreThreshold,

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("name space key must be set when a name space is used")]
    MissingNamespaceKey,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{task} failed: {message}")]
    ApiError { task: String, message: String },

    #[error("This vector store does not support delete")]
    DeleteNotSupported,

    #[error("Embedder error: {0}")]
    EmbedderError(#[from] EmbedderError),

    #[error("Network request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<String> for VectorStoreError {
    fn from(message: String) -> Self {
        VectorStoreError::Unknown(message)
    }
}
