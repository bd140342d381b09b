use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How much effort a reasoning model should spend thinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingMode {
    #[default]
    None,
    Low,
    Medium,
    High,
    /// Let the model decide.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReasoningOptions {
    pub mode: ThinkingMode,
    /// Explicit budget; takes precedence over the mode-derived one.
    pub budget_tokens: Option<u32>,
    /// Interleave thinking between tool calls (Anthropic beta).
    pub interleaved: bool,
    pub return_thinking: bool,
    pub stream_thinking: bool,
}

impl ReasoningOptions {
    pub fn new(mode: ThinkingMode) -> Self {
        ReasoningOptions {
            mode,
            return_thinking: true,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != ThinkingMode::None || self.budget_tokens.is_some()
    }

    /// Budget for a request with the given `max_tokens`.
    pub fn budget_for(&self, max_tokens: u32) -> u32 {
        self.budget_tokens
            .unwrap_or_else(|| calculate_thinking_budget(self.mode, max_tokens))
    }
}

pub fn calculate_thinking_budget(mode: ThinkingMode, max_tokens: u32) -> u32 {
    let percent: u64 = match mode {
        ThinkingMode::Low => 20,
        ThinkingMode::Medium => 50,
        ThinkingMode::High => 80,
        ThinkingMode::Auto | ThinkingMode::None => 0,
    };
    // Widened so large limits cannot overflow; the result is below max_tokens.
    (u64::from(max_tokens) * percent / 100) as u32
}

/// Whether `model` names a model with extended reasoning support.
pub fn is_reasoning_model(model: &str) -> bool {
    let model = model.to_lowercase();

    if model.starts_with("gpt-5")
        || model.starts_with("o1-")
        || model.starts_with("o3-")
        || ["o1-preview", "o1-mini", "o3-mini", "o4-mini"]
            .iter()
            .any(|m| model.contains(m))
    {
        return true;
    }

    if [
        "claude-3-7",
        "claude-3.7",
        "claude-4",
        "claude-opus-4",
        "claude-sonnet-4",
    ]
    .iter()
    .any(|m| model.contains(m))
    {
        return true;
    }

    if model.contains("deepseek-reasoner") || model.contains("deepseek-r1") {
        return true;
    }

    model.contains("grok") && model.contains("reasoning")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ThinkingTokenUsage {
    pub thinking_tokens: u64,
    pub thinking_input_tokens: u64,
    pub thinking_output_tokens: u64,
    pub thinking_budget_used: u64,
    pub thinking_budget_allocated: u64,
}

/// Collects thinking token counts from a choice's generation info.
pub fn extract_thinking_tokens(generation_info: &HashMap<String, Value>) -> ThinkingTokenUsage {
    let get = |key: &str| generation_info.get(key).and_then(Value::as_u64);
    let mut usage = ThinkingTokenUsage::default();

    if let Some(v) = get("ReasoningTokens") {
        usage.thinking_tokens = v;
    }
    if let Some(v) = get("CompletionReasoningTokens") {
        usage.thinking_output_tokens = v;
    }
    if let Some(v) = get("ThinkingTokens") {
        usage.thinking_tokens = v;
    }
    if let Some(v) = get("ThinkingInputTokens") {
        usage.thinking_input_tokens = v;
    }
    if let Some(v) = get("ThinkingOutputTokens") {
        usage.thinking_output_tokens = v;
    }
    if let Some(v) = get("ThinkingBudgetUsed") {
        usage.thinking_budget_used = v;
    }
    if let Some(v) = get("ThinkingBudgetAllocated") {
        usage.thinking_budget_allocated = v;
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_thinking_budget() {
        assert_eq!(calculate_thinking_budget(ThinkingMode::Low, 10_000), 2_000);
        assert_eq!(calculate_thinking_budget(ThinkingMode::Medium, 10_000), 5_000);
        assert_eq!(calculate_thinking_budget(ThinkingMode::High, 10_000), 8_000);
        assert_eq!(calculate_thinking_budget(ThinkingMode::Auto, 10_000), 0);
        assert_eq!(
            calculate_thinking_budget(ThinkingMode::High, u32::MAX),
            (u64::from(u32::MAX) * 80 / 100) as u32
        );
        assert_eq!(calculate_thinking_budget(ThinkingMode::Low, u32::MAX), 858_993_459);
    }

    #[test]
    fn test_is_reasoning_model() {
        assert!(is_reasoning_model("claude-3-7-sonnet-latest"));
        assert!(is_reasoning_model("claude-sonnet-4-20250514"));
        assert!(is_reasoning_model("o3-mini"));
        assert!(is_reasoning_model("deepseek-reasoner"));
        assert!(!is_reasoning_model("claude-3-5-sonnet-20240620"));
        assert!(!is_reasoning_model("gpt-4o"));
    }

    #[test]
    fn test_budget_prefers_explicit_tokens() {
        let mut options = ReasoningOptions::new(ThinkingMode::Low);
        assert_eq!(options.budget_for(10_000), 2_000);
        options.budget_tokens = Some(3_000);
        assert_eq!(options.budget_for(10_000), 3_000);
    }

    #[test]
    fn test_extract_thinking_tokens() {
        let mut info = HashMap::new();
        info.insert("ThinkingTokens".to_string(), Value::from(120));
        info.insert("ThinkingBudgetAllocated".to_string(), Value::from(2048));
        let usage = extract_thinking_tokens(&info);
        assert_eq!(usage.thinking_tokens, 120);
        assert_eq!(usage.thinking_budget_allocated, 2048);
        assert_eq!(usage.thinking_output_tokens, 0);
    }
}
