//! Incremental assembly of a Messages API response from its SSE events.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::language_models::options::StreamingFunc;

use super::{
    models::{Content, ErrorDetail, MessageResponse, Usage},
    AnthropicError,
};

#[derive(Deserialize, Debug)]
pub struct MessageStart {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    ThinkingDelta {
        thinking: String,
    },
    SignatureDelta {
        signature: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Default)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DeltaUsage {
    #[serde(default)]
    pub output_tokens: u32,
    pub input_tokens: Option<u32>,
    pub cache_creation_input_tokens: Option<u32>,
    pub cache_read_input_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: Value,
    },
    ContentBlockDelta {
        index: usize,
        delta: Delta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDeltaBody,
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ErrorDetail,
    },
    #[serde(other)]
    Unknown,
}

/// Folds stream events into a [`MessageResponse`].
///
/// Text and thinking deltas are forwarded to the optional callbacks as they
/// arrive; tool input arrives as JSON fragments that are only parsed once the
/// block is closed.
pub struct StreamAccumulator {
    response: MessageResponse,
    partial_json: HashMap<usize, String>,
    streaming_func: Option<StreamingFunc>,
    reasoning_func: Option<StreamingFunc>,
    finished: bool,
}

impl StreamAccumulator {
    pub fn new(streaming_func: Option<StreamingFunc>, reasoning_func: Option<StreamingFunc>) -> Self {
        StreamAccumulator {
            response: MessageResponse::default(),
            partial_json: HashMap::new(),
            streaming_func,
            reasoning_func,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Handles the payload of one `data:` line. Returns `true` once `message_stop` was seen.
    pub async fn handle_data(&mut self, data: &str) -> Result<bool, AnthropicError> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(self.finished);
        }
        let event: StreamEvent = serde_json::from_str(data).map_err(|e| {
            AnthropicError::StreamError(format!("failed to decode stream event: {}", e))
        })?;
        self.apply(event).await
    }

    pub async fn apply(&mut self, event: StreamEvent) -> Result<bool, AnthropicError> {
        match event {
            StreamEvent::MessageStart { message } => {
                let usage = message.usage.ok_or_else(|| {
                    AnthropicError::StreamError("message_start without usage".to_string())
                })?;
                self.response.id = message.id;
                self.response.model = message.model;
                self.response.role = message.role;
                self.response.response_type = message.message_type;
                self.response.usage = usage;
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => self.start_block(index, &content_block)?,
            StreamEvent::ContentBlockDelta { index, delta } => {
                self.apply_delta(index, delta).await?
            }
            StreamEvent::ContentBlockStop { index } => self.stop_block(index)?,
            StreamEvent::MessageDelta { delta, usage } => {
                if delta.stop_reason.is_some() {
                    self.response.stop_reason = delta.stop_reason;
                }
                if delta.stop_sequence.is_some() {
                    self.response.stop_sequence = delta.stop_sequence;
                }
                if let Some(usage) = usage {
                    self.response.usage.output_tokens = usage.output_tokens;
                    if let Some(v) = usage.input_tokens {
                        self.response.usage.input_tokens = v;
                    }
                    if let Some(v) = usage.cache_creation_input_tokens {
                        self.response.usage.cache_creation_input_tokens = v;
                    }
                    if let Some(v) = usage.cache_read_input_tokens {
                        self.response.usage.cache_read_input_tokens = v;
                    }
                }
            }
            StreamEvent::MessageStop => self.finished = true,
            StreamEvent::Ping => {}
            StreamEvent::Error { error } => {
                return Err(AnthropicError::StreamError(format!(
                    "{}: {}",
                    error.error_type, error.message
                )))
            }
            StreamEvent::Unknown => log::debug!("skipping unknown anthropic stream event"),
        }
        Ok(self.finished)
    }

    fn start_block(&mut self, index: usize, block: &Value) -> Result<(), AnthropicError> {
        let block_type = block.get("type").and_then(Value::as_str).unwrap_or("");
        let field = |name: &str| {
            block
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let content = match block_type {
            "text" => Content::text(field("text")),
            "tool_use" => Content::ToolUse {
                id: field("id"),
                name: field("name"),
                input: Map::new(),
                cache_control: None,
            },
            "thinking" => Content::Thinking {
                thinking: field("thinking"),
                signature: field("signature"),
            },
            "" => {
                return Err(AnthropicError::StreamError(
                    "content_block_start without type".to_string(),
                ))
            }
            other => {
                return Err(AnthropicError::StreamError(format!(
                    "unknown content block type: {}",
                    other
                )))
            }
        };
        if self.response.content.len() <= index {
            self.response.content.push(content);
        }
        Ok(())
    }

    async fn apply_delta(&mut self, index: usize, delta: Delta) -> Result<(), AnthropicError> {
        let block = self.response.content.get_mut(index).ok_or_else(|| {
            AnthropicError::StreamError(format!("content block index {} out of range", index))
        })?;

        match delta {
            Delta::TextDelta { text } => {
                if let Content::Text { text: current, .. } = block {
                    current.push_str(&text);
                }
                emit(&self.streaming_func, text).await?;
            }
            Delta::InputJsonDelta { partial_json } => {
                self.partial_json
                    .entry(index)
                    .or_default()
                    .push_str(&partial_json);
            }
            Delta::ThinkingDelta { thinking } => {
                if let Content::Thinking {
                    thinking: current, ..
                } = block
                {
                    current.push_str(&thinking);
                }
                emit(&self.reasoning_func, thinking).await?;
            }
            Delta::SignatureDelta { signature } => {
                if let Content::Thinking {
                    signature: current, ..
                } = block
                {
                    *current = signature;
                }
            }
            Delta::Unknown => log::debug!("skipping unknown delta for block {}", index),
        }
        Ok(())
    }

    fn stop_block(&mut self, index: usize) -> Result<(), AnthropicError> {
        let block = self.response.content.get_mut(index).ok_or_else(|| {
            AnthropicError::StreamError(format!("content block index {} out of range", index))
        })?;
        if let Content::ToolUse { input, .. } = block {
            let buffered = self.partial_json.remove(&index).unwrap_or_default();
            let buffered = buffered.trim();
            if !buffered.is_empty() {
                *input = serde_json::from_str(buffered).map_err(|e| {
                    AnthropicError::StreamError(format!("invalid tool input json: {}", e))
                })?;
            }
        }
        Ok(())
    }

    pub fn into_response(self) -> MessageResponse {
        self.response
    }
}

async fn emit(func: &Option<StreamingFunc>, chunk: String) -> Result<(), AnthropicError> {
    if let Some(func) = func {
        let mut func = func.lock().await;
        func(chunk)
            .await
            .map_err(|_| AnthropicError::StreamCallbackError)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;
    use crate::language_models::options::CallOptions;

    const SSE_TOOL_USE_EMPTY_INPUT: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_01KpsxABJ1CZwpfVuT6XFz7T","type":"message","role":"assistant","model":"claude-3-7-sonnet-latest","content":[],"stop_reason":null,"stop_sequence":null,"usage":{"input_tokens":398,"cache_creation_input_tokens":0,"cache_read_input_tokens":0,"output_tokens":1}}}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}

event: ping
data: {"type": "ping"}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"I can help you find your current IP address. "}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Let me retrieve that information for you."}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: content_block_start
data: {"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_01Kz6G8FYPmbm5x5AYQHjUzT","name":"get_current_ip_address","input":{}}}

event: content_block_delta
data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":""}}

event: content_block_stop
data: {"type":"content_block_stop","index":1}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"tool_use","stop_sequence":null},"usage":{"output_tokens":59}}

event: message_stop
data: {"type":"message_stop"}
"#;

    const SSE_TOOL_USE_WITH_INPUT: &str = r#"event: message_start
data: {"type":"message_start","message":{"id":"msg_01QdDq6hdDLd5v9fndWvs43Z","type":"message","role":"assistant","model":"claude-3-7-sonnet-latest","content":[],"stop_reason":null,"stop_sequence":null,"usage":{"input_tokens":412,"cache_creation_input_tokens":0,"cache_read_input_tokens":0,"output_tokens":4}}}

event: content_block_start
data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}

event: content_block_delta
data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"I can help you get the current time. Let me check that for you."}}

event: content_block_stop
data: {"type":"content_block_stop","index":0}

event: content_block_start
data: {"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_01Ab","name":"get_current_time","input":{}}}

event: content_block_delta
data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"format\": \"200"}}

event: content_block_delta
data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"6-01-02 15:04:05\"}"}}

event: content_block_stop
data: {"type":"content_block_stop","index":1}

event: message_delta
data: {"type":"message_delta","delta":{"stop_reason":"tool_use","stop_sequence":null},"usage":{"output_tokens":75}}

event: message_stop
data: {"type":"message_stop"}
"#;

    async fn accumulate(body: &str, options: &CallOptions) -> Result<MessageResponse, AnthropicError> {
        let mut acc = StreamAccumulator::new(
            options.streaming_func.clone(),
            options.streaming_reasoning_func.clone(),
        );
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                if acc.handle_data(data).await? {
                    break;
                }
            }
        }
        Ok(acc.into_response())
    }

    #[tokio::test]
    async fn test_tool_use_with_empty_input() {
        let chunks = Arc::new(Mutex::new(String::new()));
        let sink = chunks.clone();
        let options = CallOptions::new().with_streaming_func(move |chunk| {
            let sink = sink.clone();
            async move {
                sink.lock().await.push_str(&chunk);
                Ok(())
            }
        });

        let response = accumulate(SSE_TOOL_USE_EMPTY_INPUT, &options).await.unwrap();

        assert_eq!(response.id, "msg_01KpsxABJ1CZwpfVuT6XFz7T");
        assert_eq!(response.model, "claude-3-7-sonnet-latest");
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(response.usage.input_tokens, 398);
        assert_eq!(response.usage.output_tokens, 59);
        assert_eq!(response.content.len(), 2);
        let expected_text =
            "I can help you find your current IP address. Let me retrieve that information for you.";
        assert_eq!(response.content[0], Content::text(expected_text));
        match &response.content[1] {
            Content::ToolUse { id, name, input, .. } => {
                assert_eq!(id, "toolu_01Kz6G8FYPmbm5x5AYQHjUzT");
                assert_eq!(name, "get_current_ip_address");
                assert!(input.is_empty());
            }
            other => panic!("expected tool_use, got {:?}", other),
        }
        assert_eq!(chunks.lock().await.as_str(), expected_text);
    }

    #[tokio::test]
    async fn test_tool_use_accumulates_partial_json() {
        let response = accumulate(SSE_TOOL_USE_WITH_INPUT, &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(response.id, "msg_01QdDq6hdDLd5v9fndWvs43Z");
        match &response.content[1] {
            Content::ToolUse { name, input, .. } => {
                assert_eq!(name, "get_current_time");
                assert_eq!(
                    Value::Object(input.clone()),
                    serde_json::json!({"format": "2006-01-02 15:04:05"})
                );
            }
            other => panic!("expected tool_use, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_thinking_deltas_reach_reasoning_func() {
        let reasoning = Arc::new(Mutex::new(String::new()));
        let sink = reasoning.clone();
        let mut acc = StreamAccumulator::new(
            None,
            CallOptions::new()
                .with_streaming_reasoning_func(move |chunk| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().await.push_str(&chunk);
                        Ok(())
                    }
                })
                .streaming_reasoning_func,
        );
        let events = [
            r#"{"type":"message_start","message":{"id":"m","model":"claude-3-7-sonnet-latest","role":"assistant","type":"message","usage":{"input_tokens":1,"output_tokens":0}}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"step one"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"sig"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
        ];
        for event in events {
            acc.handle_data(event).await.unwrap();
        }
        let response = acc.into_response();
        assert_eq!(
            response.content[0],
            Content::Thinking {
                thinking: "step one".to_string(),
                signature: "sig".to_string()
            }
        );
        assert_eq!(reasoning.lock().await.as_str(), "step one");
    }

    #[tokio::test]
    async fn test_delta_index_out_of_range() {
        let mut acc = StreamAccumulator::new(None, None);
        let err = acc
            .handle_data(
                r#"{"type":"content_block_delta","index":3,"delta":{"type":"text_delta","text":"x"}}"#,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_message_start_requires_usage() {
        let mut acc = StreamAccumulator::new(None, None);
        let result = acc
            .handle_data(r#"{"type":"message_start","message":{"id":"m"}}"#)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_block_type_and_error_event() {
        let mut acc = StreamAccumulator::new(None, None);
        assert!(acc
            .handle_data(r#"{"type":"content_block_start","index":0,"content_block":{"type":"mystery"}}"#)
            .await
            .is_err());
        assert!(acc
            .handle_data(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .await
            .is_err());
        assert!(!acc
            .handle_data(r#"{"type":"something_new"}"#)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_callback_error_aborts() {
        let options = CallOptions::new().with_streaming_func(|_| async { Err(()) });
        let err = accumulate(SSE_TOOL_USE_EMPTY_INPUT, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AnthropicError::StreamCallbackError));
    }
}
