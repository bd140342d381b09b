use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::schemas::{Message, MessageType};

use super::{ChatMessageHistory, MemoryError};

/// On-disk shape of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredMessage {
    #[serde(rename = "type")]
    message_type: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Message> for StoredMessage {
    fn from(message: &Message) -> Self {
        match message.message_type {
            MessageType::HumanMessage | MessageType::AIMessage | MessageType::SystemMessage => {
                StoredMessage {
                    message_type: message.message_type.as_str().into(),
                    content: message.content.clone(),
                    name: None,
                }
            }
            MessageType::GenericMessage => StoredMessage {
                message_type: MessageType::GenericMessage.as_str().into(),
                content: message.content.clone(),
                name: message.role.clone(),
            },
            other => StoredMessage {
                message_type: MessageType::GenericMessage.as_str().into(),
                content: message.content.clone(),
                name: Some(other.as_str().into()),
            },
        }
    }
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        match stored.message_type.as_str() {
            "human" => Message::new_human_message(stored.content),
            "ai" => Message::new_ai_message(stored.content),
            "system" => Message::new_system_message(stored.content),
            _ => Message::new_generic_message(stored.name.unwrap_or_default(), stored.content),
        }
    }
}

/// Chat history persisted as a JSON array in a single file.
pub struct FileChatMessageHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileChatMessageHistory {
    /// Opens `path`, writing an empty history if the file does not exist.
    /// With `create_dirs` the parent directory is created as needed.
    pub async fn new<P: AsRef<Path>>(path: P, create_dirs: bool) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if create_dirs {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, b"[]").await?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<StoredMessage>, MemoryError> {
        let data = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save(&self, messages: &[StoredMessage]) -> Result<(), MemoryError> {
        let data = serde_json::to_vec_pretty(messages)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatMessageHistory for FileChatMessageHistory {
    async fn messages(&self) -> Result<Vec<Message>, MemoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().map(Message::from).collect())
    }

    async fn add_message(&self, message: Message) -> Result<(), MemoryError> {
        let _guard = self.lock.lock().await;
        let mut messages = self.load().await?;
        messages.push(StoredMessage::from(&message));
        self.save(&messages).await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        let _guard = self.lock.lock().await;
        tokio::fs::write(&self.path, b"[]").await?;
        Ok(())
    }

    async fn set_messages(&self, messages: Vec<Message>) -> Result<(), MemoryError> {
        let _guard = self.lock.lock().await;
        let stored: Vec<StoredMessage> = messages.iter().map(StoredMessage::from).collect();
        self.save(&stored).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/history.json");
        assert!(FileChatMessageHistory::new(&path, false).await.is_err());

        let history = FileChatMessageHistory::new(&path, true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        history.add_user_message("hello").await.unwrap();
        history.add_ai_message("hi").await.unwrap();
        history
            .add_message(Message::new_tool_message("call_1", "42"))
            .await
            .unwrap();

        let reopened = FileChatMessageHistory::new(&path, false).await.unwrap();
        let messages = reopened.messages().await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::new_human_message("hello"));
        assert_eq!(messages[1], Message::new_ai_message("hi"));
        assert_eq!(messages[2].message_type, MessageType::GenericMessage);
        assert_eq!(messages[2].role.as_deref(), Some("tool"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0], serde_json::json!({"type": "human", "content": "hello"}));
        assert_eq!(raw[2]["name"], "tool");

        history.clear().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(history.messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_history_set_messages() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileChatMessageHistory::new(dir.path().join("h.json"), false)
            .await
            .unwrap();
        history.add_user_message("old").await.unwrap();
        history
            .set_messages(vec![
                Message::new_system_message("sys"),
                Message::new_generic_message("critic", "hmm"),
            ])
            .await
            .unwrap();
        let messages = history.messages().await.unwrap();
        assert_eq!(messages[0], Message::new_system_message("sys"));
        assert_eq!(messages[1], Message::new_generic_message("critic", "hmm"));
    }
}
