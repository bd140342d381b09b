use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use crate::language_models::tokens::{approximate_tokens, encoding_for_model};
use crate::schemas::{get_buffer_string, Message, MessageType};

use super::{
    buffer::{DEFAULT_AI_PREFIX, DEFAULT_HUMAN_PREFIX, DEFAULT_MEMORY_KEY},
    BaseMemory, ChatMessageHistory, InputValues, MemoryError, MemoryValue,
    SimpleChatMessageHistory,
};

pub const DEFAULT_TOKEN_LIMIT: usize = 2800;
pub const DEFAULT_ENCODING_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MIN_MESSAGES: usize = 2;

/// How [`EnhancedTokenBuffer`] drops messages once the history is over its token limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimStrategy {
    /// Drop the oldest messages first.
    #[default]
    TrimOldest,
    /// Keep the opening and closing messages, drop from the middle.
    TrimMiddle,
    /// Currently behaves like `TrimOldest`.
    TrimByImportance,
}

impl fmt::Display for TrimStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrimStrategy::TrimOldest => "trim_oldest",
            TrimStrategy::TrimMiddle => "trim_middle",
            TrimStrategy::TrimByImportance => "trim_by_importance",
        };
        f.write_str(name)
    }
}

pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, MemoryError>;
    fn count_tokens_from_messages(&self, messages: &[Message]) -> Result<usize, MemoryError>;
}

/// Counts with the tiktoken encoding of a model, approximating from text
/// length when the model has no known encoding.
pub struct TiktokenCounter {
    model: String,
    bpe: Option<Arc<CoreBPE>>,
}

impl TiktokenCounter {
    pub fn new<S: Into<String>>(model: S) -> Self {
        let model = model.into();
        let bpe = match get_bpe_from_model(&model) {
            Ok(bpe) => Some(Arc::new(bpe)),
            Err(e) => {
                log::debug!("no tiktoken encoding for {}, approximating: {}", model, e);
                None
            }
        };
        Self { model, bpe }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn is_openai_chat_model(&self) -> bool {
        self.model.contains("gpt-3.5") || self.model.contains("gpt-4")
    }

    fn approximate_from_messages(&self, messages: &[Message]) -> usize {
        let per_message = if self.is_openai_chat_model() { 3 } else { 4 };
        let content: usize = messages
            .iter()
            .map(|m| approximate_tokens(&self.model, &m.content) + per_message)
            .sum();
        3 + content + 3
    }
}

fn chat_role(message_type: MessageType) -> &'static str {
    match message_type {
        MessageType::AIMessage => "assistant",
        MessageType::SystemMessage => "system",
        _ => "user",
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, MemoryError> {
        Ok(match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => approximate_tokens(&self.model, text),
        })
    }

    fn count_tokens_from_messages(&self, messages: &[Message]) -> Result<usize, MemoryError> {
        match &self.bpe {
            Some(bpe) if self.is_openai_chat_model() => {
                // Three tokens of framing per message plus three priming the reply.
                let tokens: usize = messages
                    .iter()
                    .map(|m| {
                        3 + bpe.encode_with_special_tokens(chat_role(m.message_type)).len()
                            + bpe.encode_with_special_tokens(&m.content).len()
                    })
                    .sum();
                Ok(tokens + 3)
            }
            _ => Ok(self.approximate_from_messages(messages)),
        }
    }
}

/// Counts the rendered `Human:`/`AI:` buffer string with the model's tokenizer.
pub struct LLMTokenCounter {
    model: String,
    bpe: Option<Arc<CoreBPE>>,
}

impl LLMTokenCounter {
    pub fn new<S: Into<String>>(model: S) -> Self {
        let model = model.into();
        let bpe = encoding_for_model(&model);
        Self { model, bpe }
    }
}

impl TokenCounter for LLMTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, MemoryError> {
        Ok(match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => approximate_tokens(&self.model, text),
        })
    }

    fn count_tokens_from_messages(&self, messages: &[Message]) -> Result<usize, MemoryError> {
        self.count_tokens(&get_buffer_string(
            messages,
            DEFAULT_HUMAN_PREFIX,
            DEFAULT_AI_PREFIX,
        ))
    }
}

/// Conversation memory that keeps its history under a token budget.
///
/// The history is trimmed after every [`save_context`](BaseMemory::save_context)
/// and before every load. A `token_limit` of zero disables trimming.
pub struct EnhancedTokenBuffer {
    chat_history: Arc<dyn ChatMessageHistory>,
    return_messages: bool,
    input_key: String,
    output_key: String,
    human_prefix: String,
    ai_prefix: String,
    memory_key: String,
    token_limit: usize,
    encoding_model: String,
    token_counter: Arc<dyn TokenCounter>,
    trim_strategy: TrimStrategy,
    preserve_pairs: bool,
    min_messages: usize,
}

impl Default for EnhancedTokenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancedTokenBuffer {
    pub fn new() -> Self {
        Self {
            chat_history: Arc::new(SimpleChatMessageHistory::new()),
            return_messages: false,
            input_key: "input".into(),
            output_key: "output".into(),
            human_prefix: DEFAULT_HUMAN_PREFIX.into(),
            ai_prefix: DEFAULT_AI_PREFIX.into(),
            memory_key: DEFAULT_MEMORY_KEY.into(),
            token_limit: DEFAULT_TOKEN_LIMIT,
            encoding_model: DEFAULT_ENCODING_MODEL.into(),
            token_counter: Arc::new(TiktokenCounter::new(DEFAULT_ENCODING_MODEL)),
            trim_strategy: TrimStrategy::default(),
            preserve_pairs: true,
            min_messages: DEFAULT_MIN_MESSAGES,
        }
    }

    pub fn with_token_limit(mut self, limit: usize) -> Self {
        self.token_limit = limit;
        self
    }

    /// Also resets the counter to a [`TiktokenCounter`] for `model`.
    pub fn with_encoding_model<S: Into<String>>(mut self, model: S) -> Self {
        self.encoding_model = model.into();
        self.token_counter = Arc::new(TiktokenCounter::new(self.encoding_model.clone()));
        self
    }

    pub fn with_token_counter<T: TokenCounter + 'static>(mut self, counter: T) -> Self {
        self.token_counter = Arc::new(counter);
        self
    }

    pub fn with_trim_strategy(mut self, strategy: TrimStrategy) -> Self {
        self.trim_strategy = strategy;
        self
    }

    pub fn with_preserve_pairs(mut self, preserve: bool) -> Self {
        self.preserve_pairs = preserve;
        self
    }

    pub fn with_min_messages(mut self, min: usize) -> Self {
        self.min_messages = min;
        self
    }

    pub fn with_chat_history<H: ChatMessageHistory + 'static>(mut self, history: H) -> Self {
        self.chat_history = Arc::new(history);
        self
    }

    pub fn with_return_messages(mut self, return_messages: bool) -> Self {
        self.return_messages = return_messages;
        self
    }

    pub fn with_input_key<S: Into<String>>(mut self, key: S) -> Self {
        self.input_key = key.into();
        self
    }

    pub fn with_output_key<S: Into<String>>(mut self, key: S) -> Self {
        self.output_key = key.into();
        self
    }

    pub fn with_human_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.human_prefix = prefix.into();
        self
    }

    pub fn with_ai_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.ai_prefix = prefix.into();
        self
    }

    pub fn with_memory_key<S: Into<String>>(mut self, key: S) -> Self {
        self.memory_key = key.into();
        self
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    pub fn set_token_limit(&mut self, limit: usize) {
        self.token_limit = limit;
    }

    pub fn trim_strategy(&self) -> TrimStrategy {
        self.trim_strategy
    }

    pub fn set_trim_strategy(&mut self, strategy: TrimStrategy) {
        self.trim_strategy = strategy;
    }

    pub fn encoding_model(&self) -> &str {
        &self.encoding_model
    }

    pub async fn get_token_count(&self) -> Result<usize, MemoryError> {
        let messages = self.chat_history.messages().await?;
        self.token_counter.count_tokens_from_messages(&messages)
    }

    pub async fn get_memory_string(&self) -> Result<String, MemoryError> {
        let messages = self.chat_history.messages().await?;
        Ok(get_buffer_string(&messages, &self.human_prefix, &self.ai_prefix))
    }

    /// Trims the stored history until it fits the token limit.
    pub async fn trim_context(&self) -> Result<(), MemoryError> {
        if self.token_limit == 0 {
            return Ok(());
        }
        let messages = self.chat_history.messages().await?;
        if messages.len() <= self.min_messages {
            return Ok(());
        }
        let count = self.token_counter.count_tokens_from_messages(&messages)?;
        if count <= self.token_limit {
            return Ok(());
        }

        let trimmed = self.trim_messages(&messages)?;
        log::debug!(
            "{} trimmed history from {} to {} messages ({} tokens over limit {})",
            self.trim_strategy,
            messages.len(),
            trimmed.len(),
            count,
            self.token_limit
        );
        self.chat_history.set_messages(trimmed).await
    }

    fn trim_messages(&self, messages: &[Message]) -> Result<Vec<Message>, MemoryError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        match self.trim_strategy {
            TrimStrategy::TrimOldest | TrimStrategy::TrimByImportance => self.trim_oldest(messages),
            TrimStrategy::TrimMiddle => self.trim_middle(messages),
        }
    }

    fn fits(&self, messages: &[Message]) -> Result<bool, MemoryError> {
        Ok(self.token_counter.count_tokens_from_messages(messages)? <= self.token_limit)
    }

    fn trim_oldest(&self, messages: &[Message]) -> Result<Vec<Message>, MemoryError> {
        let len = messages.len();
        for keep in (self.min_messages..=len).rev() {
            let mut candidate = &messages[len - keep..];
            if self.preserve_pairs {
                candidate = preserve_message_pairs(candidate);
            }
            if self.fits(candidate)? {
                return Ok(candidate.to_vec());
            }
        }
        if len >= self.min_messages {
            return Ok(messages[len - self.min_messages..].to_vec());
        }
        Ok(messages.to_vec())
    }

    fn trim_middle(&self, messages: &[Message]) -> Result<Vec<Message>, MemoryError> {
        let len = messages.len();
        if len <= self.min_messages {
            return Ok(messages.to_vec());
        }
        let keep_first = 2.min(len / 4);
        let keep_last = 2.min(len / 4);
        if keep_first + keep_last >= len {
            return Ok(messages.to_vec());
        }

        let candidate = |middle: usize| -> Vec<Message> {
            let tail = len - keep_last;
            messages[..keep_first]
                .iter()
                .chain(&messages[tail - middle..])
                .cloned()
                .collect()
        };

        // The smallest middle that fits wins; head and tail alone otherwise.
        for middle in 0..=len - keep_first - keep_last {
            let messages = candidate(middle);
            if self.fits(&messages)? {
                return Ok(messages);
            }
        }
        Ok(candidate(0))
    }
}

/// Drops a leading AI message and, for odd lengths, a trailing human message.
fn preserve_message_pairs(mut messages: &[Message]) -> &[Message] {
    if messages.len() > 1 && messages[0].message_type == MessageType::AIMessage {
        messages = &messages[1..];
    }
    if messages.len() > 1
        && messages.len() % 2 == 1
        && messages[messages.len() - 1].message_type == MessageType::HumanMessage
    {
        messages = &messages[..messages.len() - 1];
    }
    messages
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl BaseMemory for EnhancedTokenBuffer {
    fn memory_variables(&self) -> Vec<String> {
        vec![self.memory_key.clone()]
    }

    async fn load_memory_variables(
        &self,
        _inputs: &InputValues,
    ) -> Result<HashMap<String, MemoryValue>, MemoryError> {
        self.trim_context().await?;
        let messages = self.chat_history.messages().await?;
        let value = MemoryValue::render(
            messages,
            self.return_messages,
            &self.human_prefix,
            &self.ai_prefix,
        );
        Ok(HashMap::from([(self.memory_key.clone(), value)]))
    }

    async fn save_context(
        &self,
        inputs: &InputValues,
        outputs: &InputValues,
    ) -> Result<(), MemoryError> {
        let input = inputs.get(&self.input_key).ok_or_else(|| {
            MemoryError::InvalidInputValues(format!("missing input key {}", self.input_key))
        })?;
        let output = outputs.get(&self.output_key).ok_or_else(|| {
            MemoryError::InvalidInputValues(format!("missing output key {}", self.output_key))
        })?;

        self.chat_history
            .add_user_message(&value_to_string(input))
            .await?;
        self.chat_history
            .add_ai_message(&value_to_string(output))
            .await?;
        self.trim_context().await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.chat_history.clear().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// One token per character, no framing.
    struct CharCounter;

    impl TokenCounter for CharCounter {
        fn count_tokens(&self, text: &str) -> Result<usize, MemoryError> {
            Ok(text.len())
        }

        fn count_tokens_from_messages(&self, messages: &[Message]) -> Result<usize, MemoryError> {
            Ok(messages.iter().map(|m| m.content.len()).sum())
        }
    }

    fn turn(input: &str, output: &str) -> (InputValues, InputValues) {
        (
            HashMap::from([("input".to_string(), json!(input))]),
            HashMap::from([("output".to_string(), json!(output))]),
        )
    }

    fn conversation(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::new_human_message(format!("h{}", i))
                } else {
                    Message::new_ai_message(format!("a{}", i))
                }
            })
            .collect()
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_defaults() {
        let memory = EnhancedTokenBuffer::new();
        assert_eq!(memory.token_limit(), 2800);
        assert_eq!(memory.encoding_model(), "gpt-3.5-turbo");
        assert_eq!(memory.trim_strategy(), TrimStrategy::TrimOldest);
        assert!(memory.preserve_pairs);
        assert_eq!(memory.min_messages, 2);
        assert_eq!(memory.memory_variables(), vec!["history".to_string()]);
    }

    #[test]
    fn test_setters() {
        let mut memory = EnhancedTokenBuffer::new();
        memory.set_token_limit(10);
        memory.set_trim_strategy(TrimStrategy::TrimMiddle);
        assert_eq!(memory.token_limit(), 10);
        assert_eq!(memory.trim_strategy(), TrimStrategy::TrimMiddle);
    }

    #[test]
    fn test_tiktoken_counter_approximation_for_unknown_model() {
        let counter = TiktokenCounter::new("not-a-model");
        assert_eq!(counter.count_tokens("abcdefgh").unwrap(), 2);
        let messages = vec![Message::new_human_message("abcd")];
        // 3 + (1 + 4) + 3
        assert_eq!(counter.count_tokens_from_messages(&messages).unwrap(), 11);
    }

    #[test]
    fn test_tiktoken_counter_chat_model() {
        let counter = TiktokenCounter::new("gpt-3.5-turbo");
        assert!(counter.count_tokens("hello world").unwrap() >= 2);
        let one = counter
            .count_tokens_from_messages(&[Message::new_human_message("hello")])
            .unwrap();
        let two = counter
            .count_tokens_from_messages(&[
                Message::new_human_message("hello"),
                Message::new_ai_message("hello"),
            ])
            .unwrap();
        assert!(two > one);
        assert!(one > 3);
    }

    #[test]
    fn test_llm_token_counter() {
        let counter = LLMTokenCounter::new("gpt-4");
        let n = counter
            .count_tokens_from_messages(&[Message::new_human_message("hello there")])
            .unwrap();
        assert!(n > 0);
        assert_eq!(
            n,
            crate::language_models::tokens::count_tokens("gpt-4", "Human: hello there")
        );
    }

    #[test]
    fn test_preserve_message_pairs() {
        let msgs = conversation(5);
        assert_eq!(contents(preserve_message_pairs(&msgs[1..])), vec!["h2", "a3"]);
        assert_eq!(contents(preserve_message_pairs(&msgs)), vec!["h0", "a1", "h2", "a3"]);
        assert_eq!(contents(preserve_message_pairs(&msgs[..1])), vec!["h0"]);
    }

    #[tokio::test]
    async fn test_trim_oldest_keeps_recent_pairs() {
        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(4)
            .with_chat_history(SimpleChatMessageHistory::with_messages(conversation(6)));
        memory.trim_context().await.unwrap();
        let messages = memory.chat_history.messages().await.unwrap();
        assert_eq!(contents(&messages), vec!["h4", "a5"]);
        assert_eq!(memory.get_token_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_trim_oldest_fallback_to_min_messages() {
        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(1)
            .with_chat_history(SimpleChatMessageHistory::with_messages(conversation(4)));
        memory.trim_context().await.unwrap();
        let messages = memory.chat_history.messages().await.unwrap();
        assert_eq!(contents(&messages), vec!["h2", "a3"]);
    }

    #[tokio::test]
    async fn test_trim_skipped_when_within_limits() {
        let history = SimpleChatMessageHistory::with_messages(conversation(4));
        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(100)
            .with_chat_history(history);
        memory.trim_context().await.unwrap();
        assert_eq!(memory.chat_history.messages().await.unwrap().len(), 4);

        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(0)
            .with_chat_history(SimpleChatMessageHistory::with_messages(conversation(6)));
        memory.trim_context().await.unwrap();
        assert_eq!(memory.chat_history.messages().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_trim_middle() {
        // Eight messages of two tokens each; keep two at each end.
        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(12)
            .with_trim_strategy(TrimStrategy::TrimMiddle)
            .with_chat_history(SimpleChatMessageHistory::with_messages(conversation(8)));
        memory.trim_context().await.unwrap();
        let messages = memory.chat_history.messages().await.unwrap();
        assert_eq!(contents(&messages), vec!["h0", "a1", "h6", "a7"]);

        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(3)
            .with_trim_strategy(TrimStrategy::TrimMiddle)
            .with_chat_history(SimpleChatMessageHistory::with_messages(conversation(8)));
        memory.trim_context().await.unwrap();
        let messages = memory.chat_history.messages().await.unwrap();
        assert_eq!(contents(&messages), vec!["h0", "a1", "h6", "a7"]);
    }

    #[tokio::test]
    async fn test_save_context_trims_and_loads() {
        let memory = EnhancedTokenBuffer::new()
            .with_token_counter(CharCounter)
            .with_token_limit(10);
        for i in 0..5 {
            let (inputs, outputs) = turn(&format!("q{}", i), &format!("r{}", i));
            memory.save_context(&inputs, &outputs).await.unwrap();
        }
        let vars = memory.load_memory_variables(&HashMap::new()).await.unwrap();
        assert_eq!(
            vars["history"].as_text(),
            Some("Human: q3\nAI: r3\nHuman: q4\nAI: r4")
        );
        assert_eq!(
            memory.get_memory_string().await.unwrap(),
            vars["history"].as_text().unwrap()
        );
    }

    #[tokio::test]
    async fn test_save_context_requires_keys() {
        let memory = EnhancedTokenBuffer::new();
        let (inputs, _) = turn("q", "r");
        let err = memory.save_context(&inputs, &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInputValues(_)));
        let err = memory
            .save_context(&HashMap::new(), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInputValues(_)));
    }

    #[tokio::test]
    async fn test_non_string_values_and_return_messages() {
        let memory = EnhancedTokenBuffer::new().with_return_messages(true);
        let inputs = HashMap::from([("input".to_string(), json!(42))]);
        let outputs = HashMap::from([("output".to_string(), json!("ok"))]);
        memory.save_context(&inputs, &outputs).await.unwrap();
        let vars = memory.load_memory_variables(&HashMap::new()).await.unwrap();
        let messages = vars["history"].as_messages().unwrap();
        assert_eq!(messages[0].content, "42");
        memory.clear().await.unwrap();
        assert_eq!(memory.get_token_count().await.unwrap(), 3);
    }
}
