use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::schemas::Message;

use super::{BaseMemory, ChatMessageHistory, ConversationBuffer, InputValues, MemoryError, MemoryValue};

pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// A [`ConversationBuffer`] that only exposes the last `k` human/AI pairs.
pub struct ConversationWindowBuffer {
    buffer: ConversationBuffer,
    window_size: usize,
}

impl Default for ConversationWindowBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ConversationWindowBuffer {
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: ConversationBuffer::new(),
            window_size,
        }
    }

    /// Configures the wrapped buffer (history, keys, prefixes).
    pub fn with_buffer(mut self, buffer: ConversationBuffer) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_chat_history<H: ChatMessageHistory + 'static>(mut self, history: H) -> Self {
        self.buffer.chat_history = Arc::new(history);
        self
    }

    pub fn with_return_messages(mut self, return_messages: bool) -> Self {
        self.buffer.return_messages = return_messages;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    fn cut_messages(&self, mut messages: Vec<Message>) -> Vec<Message> {
        let keep = self.window_size * 2;
        if messages.len() > keep {
            messages.drain(..messages.len() - keep);
        }
        messages
    }
}

#[async_trait]
impl BaseMemory for ConversationWindowBuffer {
    fn memory_variables(&self) -> Vec<String> {
        self.buffer.memory_variables()
    }

    async fn load_memory_variables(
        &self,
        _inputs: &InputValues,
    ) -> Result<HashMap<String, MemoryValue>, MemoryError> {
        let messages = self.cut_messages(self.buffer.chat_history.messages().await?);
        let value = MemoryValue::render(
            messages,
            self.buffer.return_messages,
            &self.buffer.human_prefix,
            &self.buffer.ai_prefix,
        );
        Ok(HashMap::from([(self.buffer.memory_key.clone(), value)]))
    }

    async fn save_context(
        &self,
        inputs: &InputValues,
        outputs: &InputValues,
    ) -> Result<(), MemoryError> {
        self.buffer.save_context(inputs, outputs).await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.buffer.clear().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::memory::SimpleChatMessageHistory;

    fn turn(key: &str, value: &str) -> InputValues {
        HashMap::from([(key.to_string(), json!(value))])
    }

    #[tokio::test]
    async fn test_window_buffer() {
        let memory = ConversationWindowBuffer::new(2);
        let vars = memory.load_memory_variables(&HashMap::new()).await.unwrap();
        assert_eq!(vars["history"].as_text(), Some(""));

        for i in 1..=3 {
            memory
                .save_context(&turn("foo", &format!("bar{}", i)), &turn("bar", &format!("foo{}", i)))
                .await
                .unwrap();
        }
        let vars = memory.load_memory_variables(&HashMap::new()).await.unwrap();
        assert_eq!(
            vars["history"].as_text(),
            Some("Human: bar2\nAI: foo2\nHuman: bar3\nAI: foo3")
        );
    }

    #[tokio::test]
    async fn test_window_buffer_preloaded_messages() {
        let history = SimpleChatMessageHistory::with_messages(vec![
            Message::new_human_message("bar1"),
            Message::new_ai_message("foo1"),
            Message::new_human_message("bar2"),
            Message::new_ai_message("foo2"),
        ]);
        let memory = ConversationWindowBuffer::new(1)
            .with_chat_history(history)
            .with_return_messages(true);
        let vars = memory.load_memory_variables(&HashMap::new()).await.unwrap();
        assert_eq!(
            vars["history"].as_messages().unwrap(),
            &[Message::new_human_message("bar2"), Message::new_ai_message("foo2")]
        );
    }
}
