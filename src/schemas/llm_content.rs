use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, MessageType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON encoded arguments.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ToolCall {
    pub fn function<I: Into<String>, N: Into<String>, A: Into<String>>(
        id: I,
        name: N,
        arguments: A,
    ) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the parameters.
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strict: bool,
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDefinition>,
}

impl Tool {
    pub fn function<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        parameters: Value,
    ) -> Self {
        Tool {
            tool_type: "function".to_string(),
            function: Some(FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
                strict: false,
            }),
        }
    }
}

/// One part of a multi-modal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Binary {
        mime_type: String,
        #[serde(with = "base64_data")]
        data: Vec<u8>,
    },
    ToolCall {
        tool_call: ToolCall,
    },
    ToolResponse {
        tool_response: ToolCallResponse,
    },
}

impl ContentPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_url<S: Into<String>>(url: S) -> Self {
        ContentPart::ImageUrl {
            url: url.into(),
            detail: None,
        }
    }

    pub fn binary<S: Into<String>>(mime_type: S, data: Vec<u8>) -> Self {
        ContentPart::Binary {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            _ => None,
        }
    }
}

mod base64_data {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

/// A message sent to a model: a role plus an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    pub role: MessageType,
    pub parts: Vec<ContentPart>,
}

impl MessageContent {
    pub fn new(role: MessageType, parts: Vec<ContentPart>) -> Self {
        MessageContent { role, parts }
    }

    pub fn text_parts<S: AsRef<str>>(role: MessageType, texts: &[S]) -> Self {
        MessageContent {
            role,
            parts: texts
                .iter()
                .map(|t| ContentPart::text(t.as_ref()))
                .collect(),
        }
    }
}

/// Tool results become a single tool response part; AI turns carry their
/// tool calls after the text.
impl From<&Message> for MessageContent {
    fn from(message: &Message) -> Self {
        if message.message_type == MessageType::ToolMessage {
            return MessageContent::new(
                MessageType::ToolMessage,
                vec![ContentPart::ToolResponse {
                    tool_response: ToolCallResponse {
                        tool_call_id: message.id.clone().unwrap_or_default(),
                        name: message.name.clone().unwrap_or_default(),
                        content: message.content.clone(),
                    },
                }],
            );
        }

        let mut parts = Vec::new();
        if !message.content.is_empty() {
            parts.push(ContentPart::text(message.content.clone()));
        }
        parts.extend(
            message
                .tool_calls
                .iter()
                .cloned()
                .map(|tool_call| ContentPart::ToolCall { tool_call }),
        );
        MessageContent::new(message.message_type, parts)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentResponse {
    pub choices: Vec<ContentChoice>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentChoice {
    pub content: String,
    pub stop_reason: String,
    /// Provider specific values such as token counts.
    pub generation_info: HashMap<String, Value>,
    pub func_call: Option<FunctionCall>,
    pub tool_calls: Vec<ToolCall>,
    pub reasoning_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_part_tags() {
        let content = MessageContent::new(
            MessageType::HumanMessage,
            vec![
                ContentPart::text("describe"),
                ContentPart::binary("image/png", vec![1, 2, 3]),
            ],
        );
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["role"], "human");
        assert_eq!(json["parts"][0]["type"], "text");
        assert_eq!(json["parts"][1]["type"], "binary");
        assert_eq!(json["parts"][1]["data"], "AQID");
    }

    #[test]
    fn test_from_message() {
        let ai = Message::new_ai_message("checking")
            .with_tool_calls(vec![ToolCall::function("t1", "sum", "{}")]);
        let content = MessageContent::from(&ai);
        assert_eq!(content.role, MessageType::AIMessage);
        assert_eq!(content.parts.len(), 2);
        assert!(matches!(&content.parts[1], ContentPart::ToolCall { tool_call } if tool_call.id == "t1"));

        let tool = MessageContent::from(&Message::new_tool_message("t1", "3"));
        match &tool.parts[0] {
            ContentPart::ToolResponse { tool_response } => {
                assert_eq!(tool_response.tool_call_id, "t1");
                assert_eq!(tool_response.content, "3");
            }
            other => panic!("unexpected part {:?}", other),
        }
    }

    #[test]
    fn test_tool_call_part_from_json() {
        let raw = r#"{"type":"tool_call","tool_call":{"id":"t1","type":"function","function_call":{"name":"sum","arguments":"{\"a\":1}"}}}"#;
        let part: ContentPart = serde_json::from_str(raw).unwrap();
        match part {
            ContentPart::ToolCall { tool_call } => {
                assert_eq!(tool_call.id, "t1");
                assert_eq!(tool_call.function_call.unwrap().name, "sum");
            }
            other => panic!("unexpected part {:?}", other),
        }
    }
}
