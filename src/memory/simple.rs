use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::schemas::Message;

use super::{ChatMessageHistory, MemoryError};

/// Chat history kept in process memory.
#[derive(Default)]
pub struct SimpleChatMessageHistory {
    messages: RwLock<Vec<Message>>,
}

impl SimpleChatMessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: RwLock::new(messages),
        }
    }
}

#[async_trait]
impl ChatMessageHistory for SimpleChatMessageHistory {
    async fn messages(&self) -> Result<Vec<Message>, MemoryError> {
        Ok(self.messages.read().await.clone())
    }

    async fn add_message(&self, message: Message) -> Result<(), MemoryError> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.messages.write().await.clear();
        Ok(())
    }

    async fn set_messages(&self, messages: Vec<Message>) -> Result<(), MemoryError> {
        *self.messages.write().await = messages;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::MessageType;

    #[tokio::test]
    async fn test_simple_history() {
        let history = SimpleChatMessageHistory::new();
        history.add_user_message("hello").await.unwrap();
        history.add_ai_message("hi there").await.unwrap();
        history
            .add_message(Message::new_system_message("be nice"))
            .await
            .unwrap();

        let messages = history.messages().await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].message_type, MessageType::HumanMessage);
        assert_eq!(messages[1].content, "hi there");

        history
            .set_messages(vec![Message::new_ai_message("only")])
            .await
            .unwrap();
        assert_eq!(history.messages().await.unwrap().len(), 1);

        history.clear().await.unwrap();
        assert!(history.messages().await.unwrap().is_empty());
    }
}
