use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::schemas::{get_buffer_string, Message};

use super::MemoryError;

/// Values passed to and returned from a chain turn, keyed by variable name.
pub type InputValues = HashMap<String, Value>;

/// Storage for the messages of one conversation.
#[async_trait]
pub trait ChatMessageHistory: Send + Sync {
    async fn messages(&self) -> Result<Vec<Message>, MemoryError>;

    async fn add_message(&self, message: Message) -> Result<(), MemoryError>;

    async fn add_user_message(&self, text: &str) -> Result<(), MemoryError> {
        self.add_message(Message::new_human_message(text)).await
    }

    async fn add_ai_message(&self, text: &str) -> Result<(), MemoryError> {
        self.add_message(Message::new_ai_message(text)).await
    }

    async fn clear(&self) -> Result<(), MemoryError>;

    /// Replaces the whole history.
    async fn set_messages(&self, messages: Vec<Message>) -> Result<(), MemoryError> {
        self.clear().await?;
        for message in messages {
            self.add_message(message).await?;
        }
        Ok(())
    }
}

/// What a memory exposes under its memory key.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    Text(String),
    Messages(Vec<Message>),
}

impl MemoryValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MemoryValue::Text(text) => Some(text),
            MemoryValue::Messages(_) => None,
        }
    }

    pub fn as_messages(&self) -> Option<&[Message]> {
        match self {
            MemoryValue::Messages(messages) => Some(messages),
            MemoryValue::Text(_) => None,
        }
    }

    pub(crate) fn render(
        messages: Vec<Message>,
        return_messages: bool,
        human_prefix: &str,
        ai_prefix: &str,
    ) -> Self {
        if return_messages {
            MemoryValue::Messages(messages)
        } else {
            MemoryValue::Text(get_buffer_string(&messages, human_prefix, ai_prefix))
        }
    }
}

/// Conversation memory plugged into a chain.
#[async_trait]
pub trait BaseMemory: Send + Sync {
    fn memory_variables(&self) -> Vec<String>;

    async fn load_memory_variables(
        &self,
        inputs: &InputValues,
    ) -> Result<HashMap<String, MemoryValue>, MemoryError>;

    async fn save_context(
        &self,
        inputs: &InputValues,
        outputs: &InputValues,
    ) -> Result<(), MemoryError>;

    async fn clear(&self) -> Result<(), MemoryError>;
}

/// Picks the string value a memory should record from a set of chain values.
///
/// With a key, that key must be present. Without one, `values` must hold
/// exactly one entry.
pub fn get_input_value(values: &InputValues, key: Option<&str>) -> Result<String, MemoryError> {
    let value = match key {
        Some(key) => values.get(key).ok_or_else(|| {
            MemoryError::InvalidInputValues(format!("values do not contain key {}", key))
        })?,
        None => {
            if values.len() > 1 {
                return Err(MemoryError::InvalidInputValues(
                    "multiple keys and no input key set".into(),
                ));
            }
            values
                .values()
                .next()
                .ok_or_else(|| MemoryError::InvalidInputValues("0 keys".into()))?
        }
    };
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(MemoryError::InvalidInputValues(format!(
            "input value {} not string",
            other
        ))),
    }
}
