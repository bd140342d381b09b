use std::fmt;

use serde::{Deserialize, Serialize};

use super::{FunctionCall, ToolCall};

/// Enum `MessageType` represents the type of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessageType {
    #[serde(rename = "system")]
    SystemMessage,
    #[serde(rename = "ai")]
    AIMessage,
    #[default]
    #[serde(rename = "human")]
    HumanMessage,
    #[serde(rename = "generic")]
    GenericMessage,
    #[serde(rename = "function")]
    FunctionMessage,
    #[serde(rename = "tool")]
    ToolMessage,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::SystemMessage => "system",
            MessageType::AIMessage => "ai",
            MessageType::HumanMessage => "human",
            MessageType::GenericMessage => "generic",
            MessageType::FunctionMessage => "function",
            MessageType::ToolMessage => "tool",
        }
    }

    pub fn from_type_str(s: &str) -> Option<Self> {
        match s {
            "system" => Some(MessageType::SystemMessage),
            "ai" => Some(MessageType::AIMessage),
            "human" => Some(MessageType::HumanMessage),
            "generic" => Some(MessageType::GenericMessage),
            "function" => Some(MessageType::FunctionMessage),
            "tool" => Some(MessageType::ToolMessage),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of a conversation.
///
/// Only the fields relevant for a given [`MessageType`] are populated:
/// `role` and `name` for generic messages, `name` for function results,
/// `id` for tool results and `tool_calls`/`function_call` for AI turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Message {
    pub content: String,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    pub fn new_human_message<T: fmt::Display>(content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::HumanMessage,
            ..Default::default()
        }
    }

    pub fn new_system_message<T: fmt::Display>(content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::SystemMessage,
            ..Default::default()
        }
    }

    pub fn new_ai_message<T: fmt::Display>(content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::AIMessage,
            ..Default::default()
        }
    }

    pub fn new_generic_message<R: Into<String>, T: fmt::Display>(role: R, content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::GenericMessage,
            role: Some(role.into()),
            ..Default::default()
        }
    }

    pub fn new_function_message<N: Into<String>, T: fmt::Display>(name: N, content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::FunctionMessage,
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn new_tool_message<I: Into<String>, T: fmt::Display>(id: I, content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::ToolMessage,
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_function_call(mut self, function_call: FunctionCall) -> Self {
        self.function_call = Some(function_call);
        self
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Persisted shape of a message: `{"type": "...", "data": {"content": "...", "type": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageModel {
    #[serde(rename = "type")]
    pub message_type: String,
    pub data: ChatMessageModelData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageModelData {
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

impl From<&Message> for ChatMessageModel {
    fn from(message: &Message) -> Self {
        let message_type = message.message_type.as_str().to_string();
        ChatMessageModel {
            message_type: message_type.clone(),
            data: ChatMessageModelData {
                content: message.content.clone(),
                message_type,
            },
        }
    }
}

impl ChatMessageModel {
    /// Returns `None` for unknown type tags.
    pub fn to_message(&self) -> Option<Message> {
        let message_type = MessageType::from_type_str(&self.message_type)?;
        Some(Message {
            content: self.data.content.clone(),
            message_type,
            ..Default::default()
        })
    }
}

/// Renders messages as `"<role>: <content>"` lines joined with `\n`.
pub fn get_buffer_string(messages: &[Message], human_prefix: &str, ai_prefix: &str) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.message_type {
                MessageType::HumanMessage => human_prefix,
                MessageType::AIMessage => ai_prefix,
                MessageType::SystemMessage => "System",
                MessageType::GenericMessage => m.role.as_deref().unwrap_or("Generic"),
                MessageType::FunctionMessage => "Function",
                MessageType::ToolMessage => "Tool",
            };
            let mut line = format!("{}: {}", role, m.content);
            if m.message_type == MessageType::AIMessage {
                if let Some(call) = &m.function_call {
                    if let Ok(json) = serde_json::to_string(call) {
                        line.push(' ');
                        line.push_str(&json);
                    }
                }
            }
            line
        })
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_buffer_string() {
        let messages = vec![
            Message::new_system_message("be brief"),
            Message::new_human_message("hello"),
            Message::new_ai_message("hi"),
            Message::new_generic_message("narrator", "meanwhile"),
            Message::new_tool_message("call_1", "42"),
        ];
        let buffer = get_buffer_string(&messages, "Human", "AI");
        assert_eq!(
            buffer,
            "System: be brief\nHuman: hello\nAI: hi\nnarrator: meanwhile\nTool: 42"
        );
    }

    #[test]
    fn test_get_buffer_string_appends_function_call() {
        let message = Message::new_ai_message("calling").with_function_call(FunctionCall {
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
        });
        let buffer = get_buffer_string(&[message], "Human", "AI");
        assert_eq!(buffer, r#"AI: calling {"name":"lookup","arguments":"{}"}"#);
    }

    #[test]
    fn test_get_buffer_string_empty() {
        assert_eq!(get_buffer_string(&[], "Human", "AI"), "");
    }

    #[test]
    fn test_chat_message_model_conversion() {
        let model = ChatMessageModel::from(&Message::new_ai_message("foo"));
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "ai", "data": {"content": "foo", "type": "ai"}})
        );
        let back = model.to_message().unwrap();
        assert_eq!(back.message_type, MessageType::AIMessage);
        assert_eq!(back.content, "foo");
    }
}
