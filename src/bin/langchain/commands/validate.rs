use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::ValueEnum;
use langchain_adapters::{
    language_models::llm::LLM,
    llm::{claude::Claude, openai::OpenAI},
};
use serde::Serialize;

const TEST_PROMPT: &str = "Say 'Hello from LangChain!'";
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_PREVIEW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Openai,
    Anthropic,
    All,
}

impl Provider {
    fn expand(self) -> Vec<Provider> {
        match self {
            Provider::All => vec![Provider::Openai, Provider::Anthropic],
            p => vec![p],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::All => "All",
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Provider::Openai => "OPENAI_API_KEY",
            Provider::Anthropic | Provider::All => "ANTHROPIC_API_KEY",
        }
    }

    fn client(self) -> Box<dyn LLM> {
        match self {
            Provider::Openai => OpenAI::default().into(),
            Provider::Anthropic | Provider::All => Claude::new().into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub test: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn pass(test: String, message: impl Into<String>) -> Self {
        Self {
            test,
            success: true,
            message: message.into(),
            error: None,
        }
    }

    fn fail(test: String, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            test,
            success: false,
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

pub fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{}...", head)
}

async fn completion_test(llm: &dyn LLM, test: String) -> ValidationResult {
    match tokio::time::timeout(COMPLETION_TIMEOUT, llm.invoke(TEST_PROMPT)).await {
        Ok(Ok(response)) => ValidationResult::pass(
            test,
            format!("Response: {}", truncate(&response, MAX_RESPONSE_PREVIEW)),
        ),
        Ok(Err(e)) => ValidationResult::fail(test, "Completion request failed", e.to_string()),
        Err(_) => ValidationResult::fail(
            test,
            "Completion request timed out",
            format!("no response within {}s", COMPLETION_TIMEOUT.as_secs()),
        ),
    }
}

pub async fn validate_provider(provider: Provider, quick: bool) -> Vec<ValidationResult> {
    let label = provider.label();
    let mut results = Vec::new();

    let key_test = format!("{} API key", label);
    match env::var(provider.key_var()) {
        Ok(key) if !key.trim().is_empty() => {
            results.push(ValidationResult::pass(key_test, format!("{} is set", provider.key_var())));
        }
        _ => {
            results.push(ValidationResult::fail(
                key_test,
                format!("{} is not set", provider.key_var()),
                "missing API key",
            ));
            return results;
        }
    }

    let llm = provider.client();
    results.push(ValidationResult::pass(
        format!("{} client", label),
        "Client created",
    ));

    if !quick {
        log::debug!("running {} completion test", label);
        results.push(completion_test(llm.as_ref(), format!("{} completion", label)).await);
    }
    results
}

fn print_result(result: &ValidationResult) {
    let mark = if result.success { "PASS" } else { "FAIL" };
    println!("  [{}] {}: {}", mark, result.test, result.message);
    if let Some(error) = &result.error {
        println!("         error: {}", error);
    }
}

pub async fn validate(provider: Provider, quick: bool) -> Result<()> {
    println!("Validating LangChain configuration...\n");
    let mut results = Vec::new();
    for p in provider.expand() {
        println!("{}:", p.label());
        let provider_results = validate_provider(p, quick).await;
        provider_results.iter().for_each(print_result);
        println!();
        results.extend(provider_results);
    }

    let passed = results.iter().filter(|r| r.success).count();
    let failed = results.len() - passed;
    println!("Summary: {} passed, {} failed", passed, failed);

    if failed > 0 {
        bail!("{} validation check(s) failed", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("  short  ", 50), "short");
        let long = "a".repeat(60);
        assert_eq!(truncate(&long, 50), format!("{}...", "a".repeat(50)));
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_expand() {
        assert_eq!(Provider::All.expand(), vec![Provider::Openai, Provider::Anthropic]);
        assert_eq!(Provider::Anthropic.expand(), vec![Provider::Anthropic]);
    }

    #[test]
    fn test_result_serialization() {
        let ok = serde_json::to_value(ValidationResult::pass("t".into(), "m")).unwrap();
        assert!(ok.get("error").is_none());
        let err = serde_json::to_value(ValidationResult::fail("t".into(), "m", "e")).unwrap();
        assert_eq!(err["error"], "e");
        assert_eq!(err["success"], false);
    }
}
