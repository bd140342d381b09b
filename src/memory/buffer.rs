use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{
    get_input_value, BaseMemory, ChatMessageHistory, InputValues, MemoryError, MemoryValue,
    SimpleChatMessageHistory,
};

pub const DEFAULT_HUMAN_PREFIX: &str = "Human";
pub const DEFAULT_AI_PREFIX: &str = "AI";
pub const DEFAULT_MEMORY_KEY: &str = "history";

/// Memory that records every turn and returns the full conversation.
pub struct ConversationBuffer {
    pub(crate) chat_history: Arc<dyn ChatMessageHistory>,
    pub(crate) return_messages: bool,
    pub(crate) input_key: Option<String>,
    pub(crate) output_key: Option<String>,
    pub(crate) human_prefix: String,
    pub(crate) ai_prefix: String,
    pub(crate) memory_key: String,
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self {
            chat_history: Arc::new(SimpleChatMessageHistory::new()),
            return_messages: false,
            input_key: None,
            output_key: None,
            human_prefix: DEFAULT_HUMAN_PREFIX.into(),
            ai_prefix: DEFAULT_AI_PREFIX.into(),
            memory_key: DEFAULT_MEMORY_KEY.into(),
        }
    }

    pub fn with_chat_history<H: ChatMessageHistory + 'static>(mut self, history: H) -> Self {
        self.chat_history = Arc::new(history);
        self
    }

    pub fn with_shared_chat_history(mut self, history: Arc<dyn ChatMessageHistory>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn with_return_messages(mut self, return_messages: bool) -> Self {
        self.return_messages = return_messages;
        self
    }

    pub fn with_input_key<S: Into<String>>(mut self, key: S) -> Self {
        self.input_key = Some(key.into());
        self
    }

    pub fn with_output_key<S: Into<String>>(mut self, key: S) -> Self {
        self.output_key = Some(key.into());
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

    pub fn memory_key(&self) -> &str {
        &self.memory_key
    }

    pub fn chat_history(&self) -> Arc<dyn ChatMessageHistory> {
        self.chat_history.clone()
    }
}

#[async_trait]
impl BaseMemory for ConversationBuffer {
    fn memory_variables(&self) -> Vec<String> {
        vec![self.memory_key.clone()]
    }

    async fn load_memory_variables(
        &self,
        _inputs: &InputValues,
    ) -> Result<HashMap<String, MemoryValue>, MemoryError> {
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
        let input = get_input_value(inputs, self.input_key.as_deref())?;
        self.chat_history.add_user_message(&input).await?;
        let output = get_input_value(outputs, self.output_key.as_deref())?;
        self.chat_history.add_ai_message(&output).await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.chat_history.clear().await
    }
}
