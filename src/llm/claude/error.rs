use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnthropicError {
    #[error("missing the Anthropic API key, set it in the ANTHROPIC_API_KEY environment variable")]
    MissingApiKey,

    #[error("Anthropic API error: Invalid request - {0}")]
    InvalidRequestError(String),

    #[error("Anthropic API error: Authentication failed - {0}")]
    AuthenticationError(String),

    #[error("Anthropic API error: Permission denied - {0}")]
    PermissionError(String),

    #[error("Anthropic API error: Not found - {0}")]
    NotFoundError(String),

    #[error("Anthropic API error: Rate limit exceeded - {0}")]
    RateLimitError(String),

    #[error("Anthropic API error: Overloaded - {0}")]
    OverloadedError(String),

    #[error("API returned unexpected status code: {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("unsupported message type: {0}")]
    UnsupportedMessageType(String),

    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("streaming callback returned an error")]
    StreamCallbackError,
}
