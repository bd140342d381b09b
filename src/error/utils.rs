//! 错误代码
//!
//! Numeric codes grouped by module, used when reporting errors.

use std::fmt;

use crate::embedding::EmbedderError;
use crate::language_models::LLMError;
use crate::llm::AnthropicError;
use crate::memory::MemoryError;
use crate::vectorstore::VectorStoreError;

use super::LangChainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// LLM 相关错误 (1000-1999)
    LLMError = 1000,
    LLMTimeout = 1001,
    LLMRateLimit = 1002,
    LLMInvalidResponse = 1003,
    LLMAuthentication = 1004,

    /// Embedding 相关错误 (2000-2999)
    EmbedderError = 2000,
    EmbedderRequestError = 2001,
    EmbedderWrongNumberOfVectors = 2002,

    /// Vector Store 相关错误 (3000-3999)
    VectorStoreError = 3000,
    VectorStoreConnectionError = 3001,
    VectorStoreQueryError = 3002,
    VectorStoreInvalidOption = 3003,

    /// Memory 相关错误 (4000-4999)
    MemoryError = 4000,
    MemoryInvalidInput = 4001,
    MemoryStorageError = 4002,

    /// 通用错误 (9000-9999)
    ConfigurationError = 9000,
    IOError = 9001,
    JsonError = 9002,
    UnknownError = 9999,
}

impl ErrorCode {
    pub fn from_error(error: &LangChainError) -> Self {
        match error {
            LangChainError::LLMError(e) => match e {
                LLMError::Timeout(_) => ErrorCode::LLMTimeout,
                LLMError::AnthropicError(AnthropicError::RateLimitError(_)) => {
                    ErrorCode::LLMRateLimit
                }
                LLMError::AnthropicError(AnthropicError::AuthenticationError(_))
                | LLMError::AnthropicError(AnthropicError::MissingApiKey) => {
                    ErrorCode::LLMAuthentication
                }
                LLMError::EmptyResponse
                | LLMError::ContentNotFound(_)
                | LLMError::ParsingError(_) => ErrorCode::LLMInvalidResponse,
                _ => ErrorCode::LLMError,
            },
            LangChainError::EmbedderError(e) => match e {
                EmbedderError::RequestError(_) => ErrorCode::EmbedderRequestError,
                EmbedderError::WrongNumberOfVectors { .. } => {
                    ErrorCode::EmbedderWrongNumberOfVectors
                }
                _ => ErrorCode::EmbedderError,
            },
            LangChainError::VectorStoreError(e) => match e {
                VectorStoreError::RequestError(_) => ErrorCode::VectorStoreConnectionError,
                VectorStoreError::ApiError { .. }
                | VectorStoreError::EmptyResponse
                | VectorStoreError::InvalidResponse(_) => ErrorCode::VectorStoreQueryError,
                VectorStoreError::UnsupportedOption(_)
                | VectorStoreError::InvalidScoreThreshold
                | VectorStoreError::InvalidParameter(_) => ErrorCode::VectorStoreInvalidOption,
                _ => ErrorCode::VectorStoreError,
            },
            LangChainError::MemoryError(e) => match e {
                MemoryError::InvalidInputValues(_) => ErrorCode::MemoryInvalidInput,
                MemoryError::IoError(_) | MemoryError::SerdeError(_) => {
                    ErrorCode::MemoryStorageError
                }
                _ => ErrorCode::MemoryError,
            },
            LangChainError::ConfigurationError(_) => ErrorCode::ConfigurationError,
            LangChainError::IOError(_) => ErrorCode::IOError,
            LangChainError::JsonError(_) => ErrorCode::JsonError,
            LangChainError::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::LLMError => "LLM operation failed",
            ErrorCode::LLMTimeout => "LLM request timed out",
            ErrorCode::LLMRateLimit => "LLM rate limit exceeded",
            ErrorCode::LLMInvalidResponse => "LLM returned invalid response",
            ErrorCode::LLMAuthentication => "LLM authentication failed",
            ErrorCode::EmbedderError => "Embedding operation failed",
            ErrorCode::EmbedderRequestError => "Embedding request failed",
            ErrorCode::EmbedderWrongNumberOfVectors => "Embedder returned wrong number of vectors",
            ErrorCode::VectorStoreError => "Vector store operation failed",
            ErrorCode::VectorStoreConnectionError => "Vector store connection failed",
            ErrorCode::VectorStoreQueryError => "Vector store query failed",
            ErrorCode::VectorStoreInvalidOption => "Vector store received invalid options",
            ErrorCode::MemoryError => "Memory operation failed",
            ErrorCode::MemoryInvalidInput => "Memory received invalid input values",
            ErrorCode::MemoryStorageError => "Memory storage failed",
            ErrorCode::ConfigurationError => "Configuration error",
            ErrorCode::IOError => "IO operation failed",
            ErrorCode::JsonError => "JSON parsing/serialization failed",
            ErrorCode::UnknownError => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}: {}", self.as_u32(), self.description())
    }
}

/// 获取错误的完整信息，包括错误代码
pub fn error_info(error: &LangChainError) -> String {
    format!("[{}] {}", ErrorCode::from_error(error), error)
}
