//! Provider-independent classification of LLM errors.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use super::LLMError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    Unknown,
    Canceled,
    Timeout,
    Authentication,
    RateLimit,
    InvalidRequest,
    ResourceNotFound,
    QuotaExceeded,
    ContentFilter,
    TokenLimit,
    ProviderUnavailable,
    NotImplemented,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorCode::Unknown => "unknown",
            ProviderErrorCode::Canceled => "canceled",
            ProviderErrorCode::Timeout => "timeout",
            ProviderErrorCode::Authentication => "authentication",
            ProviderErrorCode::RateLimit => "rate_limit",
            ProviderErrorCode::InvalidRequest => "invalid_request",
            ProviderErrorCode::ResourceNotFound => "resource_not_found",
            ProviderErrorCode::QuotaExceeded => "quota_exceeded",
            ProviderErrorCode::ContentFilter => "content_filter",
            ProviderErrorCode::TokenLimit => "token_limit",
            ProviderErrorCode::ProviderUnavailable => "provider_unavailable",
            ProviderErrorCode::NotImplemented => "not_implemented",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified provider error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    pub code: ProviderErrorCode,
    pub provider: String,
    pub message: String,
    pub details: HashMap<String, Value>,
}

impl ProviderError {
    pub fn new<P: Into<String>, M: Into<String>>(
        code: ProviderErrorCode,
        provider: P,
        message: M,
    ) -> Self {
        ProviderError {
            code,
            provider: provider.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Rate limits, timeouts and provider outages are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ProviderErrorCode::RateLimit
                | ProviderErrorCode::Timeout
                | ProviderErrorCode::ProviderUnavailable
        )
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.provider.is_empty() {
            write!(f, "{}: {}", self.code, self.message)
        } else {
            write!(f, "{} {}: {}", self.provider, self.code, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

pub fn is_error_code(err: &ProviderError, code: ProviderErrorCode) -> bool {
    err.code == code
}

struct ErrorMatcher {
    patterns: Vec<String>,
    code: ProviderErrorCode,
    message: Option<String>,
}

impl ErrorMatcher {
    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }
}

/// Maps raw errors to [`ProviderError`] using ordered substring matchers.
pub struct ErrorMapper {
    provider: String,
    matchers: Vec<ErrorMatcher>,
}

impl ErrorMapper {
    pub fn new<P: Into<String>>(provider: P) -> Self {
        let builtin: [(&[&str], ProviderErrorCode); 9] = [
            (
                &["unauthorized", "authentication", "api key", "401"],
                ProviderErrorCode::Authentication,
            ),
            (
                &["rate limit", "too many requests", "429"],
                ProviderErrorCode::RateLimit,
            ),
            (
                &["invalid request", "bad request", "400"],
                ProviderErrorCode::InvalidRequest,
            ),
            (&["not found", "404"], ProviderErrorCode::ResourceNotFound),
            (
                &["quota", "limit exceeded", "insufficient"],
                ProviderErrorCode::QuotaExceeded,
            ),
            (
                &["content filter", "safety", "blocked", "inappropriate"],
                ProviderErrorCode::ContentFilter,
            ),
            (
                &["token limit", "maximum context", "context length", "too long"],
                ProviderErrorCode::TokenLimit,
            ),
            (
                &["service unavailable", "503", "500", "internal server"],
                ProviderErrorCode::ProviderUnavailable,
            ),
            (
                &["not implemented", "not supported", "unsupported"],
                ProviderErrorCode::NotImplemented,
            ),
        ];

        ErrorMapper {
            provider: provider.into(),
            matchers: builtin
                .iter()
                .map(|(patterns, code)| ErrorMatcher {
                    patterns: patterns.iter().map(|p| p.to_string()).collect(),
                    code: *code,
                    message: None,
                })
                .collect(),
        }
    }

    /// Adds a matcher that takes priority over every existing one.
    pub fn add_matcher(
        mut self,
        patterns: &[&str],
        code: ProviderErrorCode,
        message: Option<&str>,
    ) -> Self {
        self.matchers.insert(
            0,
            ErrorMatcher {
                patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
                code,
                message: message.map(str::to_string),
            },
        );
        self
    }

    pub fn anthropic() -> Self {
        ErrorMapper::new("anthropic")
            .add_matcher(&["credit_balance"], ProviderErrorCode::QuotaExceeded, None)
            .add_matcher(
                &["invalid_x_api_key"],
                ProviderErrorCode::Authentication,
                Some(
                    "Invalid Anthropic API key. Please check your ANTHROPIC_API_KEY environment variable.",
                ),
            )
    }

    pub fn openai() -> Self {
        ErrorMapper::new("openai")
            .add_matcher(&["model_not_found"], ProviderErrorCode::ResourceNotFound, None)
            .add_matcher(&["invalid_api_key"], ProviderErrorCode::Authentication, None)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Classifies an error message.
    pub fn map_message(&self, message: &str) -> ProviderError {
        let lowered = message.to_lowercase();
        let matched = self.matchers.iter().find(|m| m.matches(&lowered));
        match matched {
            Some(m) => ProviderError::new(
                m.code,
                self.provider.clone(),
                m.message.clone().unwrap_or_else(|| message.to_string()),
            ),
            None => ProviderError::new(ProviderErrorCode::Unknown, self.provider.clone(), message),
        }
    }

    pub fn map_error(&self, err: &LLMError) -> ProviderError {
        match err {
            LLMError::Timeout(_) => {
                ProviderError::new(ProviderErrorCode::Timeout, self.provider.clone(), err.to_string())
            }
            LLMError::RequestError(e)
            | LLMError::AnthropicError(crate::llm::AnthropicError::RequestError(e))
                if e.is_timeout() =>
            {
                ProviderError::new(ProviderErrorCode::Timeout, self.provider.clone(), err.to_string())
            }
            _ => self.map_message(&err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns() {
        let mapper = ErrorMapper::new("test");
        let cases = [
            ("401 Unauthorized", ProviderErrorCode::Authentication),
            ("Too Many Requests", ProviderErrorCode::RateLimit),
            ("bad request: missing field", ProviderErrorCode::InvalidRequest),
            ("model not found", ProviderErrorCode::ResourceNotFound),
            ("You exceeded your current quota", ProviderErrorCode::QuotaExceeded),
            ("blocked by safety system", ProviderErrorCode::ContentFilter),
            ("maximum context length is 8192", ProviderErrorCode::TokenLimit),
            ("503 Service Unavailable", ProviderErrorCode::ProviderUnavailable),
            ("streaming not supported", ProviderErrorCode::NotImplemented),
            ("something odd", ProviderErrorCode::Unknown),
        ];
        for (message, code) in cases {
            assert_eq!(mapper.map_message(message).code, code, "{}", message);
        }
    }

    #[test]
    fn test_anthropic_matchers() {
        let mapper = ErrorMapper::anthropic();
        let err = mapper.map_message("authentication_error: invalid_x_api_key");
        assert_eq!(err.code, ProviderErrorCode::Authentication);
        assert!(err.message.contains("ANTHROPIC_API_KEY"));
        assert_eq!(err.provider, "anthropic");

        let err = mapper.map_message("Your credit_balance is too low");
        assert_eq!(err.code, ProviderErrorCode::QuotaExceeded);
    }

    #[test]
    fn test_custom_matcher_takes_priority() {
        let mapper = ErrorMapper::new("test").add_matcher(
            &["429"],
            ProviderErrorCode::QuotaExceeded,
            None,
        );
        assert_eq!(
            mapper.map_message("HTTP 429").code,
            ProviderErrorCode::QuotaExceeded
        );
    }

    #[test]
    fn test_retryable() {
        let mapper = ErrorMapper::openai();
        assert!(mapper.map_message("rate limit reached").is_retryable());
        assert!(!mapper.map_message("invalid_api_key").is_retryable());
        assert!(is_error_code(
            &mapper.map_message("model_not_found"),
            ProviderErrorCode::ResourceNotFound
        ));
    }
}
