use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, RequestBuilder,
};
use reqwest_eventsource::{Event, EventSource};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::{
    language_models::{
        llm::LLM,
        options::{CallOptions, ToolChoice},
        reasoning::is_reasoning_model,
        LLMError,
    },
    llm::AnthropicError,
    schemas::{ContentChoice, ContentPart, ContentResponse, MessageContent, MessageType, ToolCall},
};

use super::{
    models::{
        CacheControl, ChatMessage, CompletionPayload, CompletionResponse, Content, ErrorResponse,
        ImageSource, MessagePayload, MessageResponse, ThinkingConfig, ToolChoiceParam,
        ToolDefinition,
    },
    stream::StreamAccumulator,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_COMPLETION_MODEL: &str = "claude-instant-1";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_COMPLETION_MAX_TOKENS: u32 = 256;
const MIN_THINKING_TOKENS: u32 = 1024;
const INTERLEAVED_THINKING_BETA: &str = "interleaved-thinking-2025-05-14";

/// Parse error from response and return appropriate AnthropicError
fn parse_error_response(status: u16, body: &str) -> AnthropicError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    match status {
        400 => AnthropicError::InvalidRequestError(message),
        401 => AnthropicError::AuthenticationError(message),
        403 => AnthropicError::PermissionError(message),
        404 => AnthropicError::NotFoundError(message),
        429 => AnthropicError::RateLimitError(message),
        529 => AnthropicError::OverloadedError(message),
        _ => AnthropicError::ApiError { status, message },
    }
}

/// Maps a failed streaming response, keeping the status when the body cannot be read.
async fn read_error_response(status: u16, response: reqwest::Response) -> AnthropicError {
    match response.text().await {
        Ok(body) => parse_error_response(status, &body),
        Err(e) => {
            log::debug!("failed to read anthropic error body: {}", e);
            parse_error_response(status, &format!("failed to read response body: {}", e))
        }
    }
}

/// Which parts of a request are marked as prompt-cache breakpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSettings {
    pub tools: bool,
    pub system: bool,
    pub chat: bool,
}

impl CacheSettings {
    pub fn all() -> Self {
        CacheSettings {
            tools: true,
            system: true,
            chat: true,
        }
    }
}

/// Anthropic client over the Messages API, with the legacy text completions API on request.
#[derive(Clone)]
pub struct Claude {
    model: String,
    options: CallOptions,
    api_key: Option<SecretString>,
    base_url: String,
    api_version: String,
    beta_headers: Vec<String>,
    use_legacy_text_completions_api: bool,
    cache: CacheSettings,
    client: Client,
}

impl Default for Claude {
    fn default() -> Self {
        Self::new()
    }
}

impl Claude {
    /// Create a new client; the API key is read from `ANTHROPIC_API_KEY`.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            options: CallOptions::default(),
            api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            beta_headers: Vec::new(),
            use_legacy_text_completions_api: false,
            cache: CacheSettings::default(),
            client: Client::new(),
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_version<S: Into<String>>(mut self, api_version: S) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Adds a value to the `anthropic-beta` header.
    pub fn with_beta_header<S: Into<String>>(mut self, beta: S) -> Self {
        self.beta_headers.push(beta.into());
        self
    }

    pub fn with_legacy_text_completions_api(mut self) -> Self {
        self.use_legacy_text_completions_api = true;
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn supports_reasoning(&self) -> bool {
        is_reasoning_model(&self.model)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self, extra_beta: &[&str]) -> Result<HeaderMap, AnthropicError> {
        let api_key = self.api_key.as_ref().ok_or(AnthropicError::MissingApiKey)?;
        let mut headers = HeaderMap::new();
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            AnthropicError::InvalidRequestError(format!("invalid header value: {}", e))
        };
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.expose_secret()).map_err(invalid)?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&self.api_version).map_err(invalid)?,
        );
        let mut betas: Vec<&str> = self.beta_headers.iter().map(String::as_str).collect();
        betas.extend(extra_beta.iter().filter(|b| !self.beta_headers.iter().any(|h| h == *b)));
        if !betas.is_empty() {
            headers.insert(
                "anthropic-beta",
                HeaderValue::from_str(&betas.join(",")).map_err(invalid)?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Builds the Messages API request body for `messages`.
    pub fn build_payload(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<MessagePayload, AnthropicError> {
        let (chat_messages, system) = process_messages(messages)?;
        let model = options.model.clone().unwrap_or_else(|| self.model.clone());
        let max_tokens = options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let mut payload = MessagePayload {
            model,
            messages: chat_messages,
            system: (!system.is_empty()).then(|| vec![Content::text(system)]),
            max_tokens,
            stop_sequences: options.stop_words.clone(),
            stream: options.streaming_func.is_some(),
            temperature: options.temperature.filter(|t| *t != 0.0),
            top_p: options.top_p.filter(|p| *p != 0.0),
            top_k: options.top_k,
            tools: options.tools.as_ref().map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.function.as_ref())
                    .map(|f| ToolDefinition {
                        name: f.name.clone(),
                        description: f.description.clone(),
                        input_schema: f.parameters.clone(),
                        cache_control: None,
                    })
                    .collect()
            }),
            tool_choice: options.tool_choice.as_ref().map(|choice| match choice {
                ToolChoice::Auto => ToolChoiceParam {
                    choice_type: "auto".to_string(),
                    name: None,
                },
                ToolChoice::Any => ToolChoiceParam {
                    choice_type: "any".to_string(),
                    name: None,
                },
                ToolChoice::None => ToolChoiceParam {
                    choice_type: "none".to_string(),
                    name: None,
                },
                ToolChoice::Tool(name) => ToolChoiceParam {
                    choice_type: "tool".to_string(),
                    name: Some(name.clone()),
                },
            }),
            thinking: None,
        };

        if let Some(reasoning) = options.reasoning.as_ref().filter(|r| r.is_enabled()) {
            if is_reasoning_model(&payload.model) {
                let mut budget = reasoning.budget_for(max_tokens);
                if budget >= max_tokens {
                    budget = max_tokens.saturating_sub(1);
                }
                if budget >= MIN_THINKING_TOKENS {
                    payload.thinking = Some(ThinkingConfig {
                        thinking_type: "enabled".to_string(),
                        budget_tokens: budget,
                    });
                    // Sampling parameters are rejected while thinking
                    payload.temperature = None;
                    payload.top_p = None;
                } else {
                    log::debug!(
                        "thinking budget {} below minimum {}, thinking disabled",
                        budget,
                        MIN_THINKING_TOKENS
                    );
                }
            } else {
                log::debug!("model {} does not support thinking", payload.model);
            }
        }

        self.apply_cache(&mut payload);
        Ok(payload)
    }

    fn apply_cache(&self, payload: &mut MessagePayload) {
        if self.cache.system {
            if let Some(block) = payload.system.as_mut().and_then(|s| s.last_mut()) {
                block.set_cache_control(CacheControl::ephemeral());
            }
        }
        if self.cache.tools {
            if let Some(tool) = payload.tools.as_mut().and_then(|t| t.last_mut()) {
                tool.cache_control = Some(CacheControl::ephemeral());
            }
        }
        if self.cache.chat {
            if let Some(message) = payload.messages.last_mut() {
                for block in message.content.iter_mut().rev() {
                    if block.set_cache_control(CacheControl::ephemeral()) {
                        break;
                    }
                }
            }
        }
    }

    async fn create_message(
        &self,
        payload: &MessagePayload,
        options: &CallOptions,
    ) -> Result<MessageResponse, AnthropicError> {
        let interleaved = payload.thinking.is_some()
            && options.reasoning.as_ref().is_some_and(|r| r.interleaved);
        let betas: &[&str] = if interleaved {
            &[INTERLEAVED_THINKING_BETA]
        } else {
            &[]
        };
        let request = self
            .client
            .post(self.url("messages"))
            .headers(self.headers(betas)?)
            .json(payload);

        if payload.stream {
            return self.stream_message(request, options).await;
        }

        let res = request.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        if !(200..300).contains(&status) {
            return Err(parse_error_response(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| AnthropicError::InvalidContentType(format!("{}: {}", e, body)))
    }

    async fn stream_message(
        &self,
        request: RequestBuilder,
        options: &CallOptions,
    ) -> Result<MessageResponse, AnthropicError> {
        let mut source =
            EventSource::new(request).map_err(|e| AnthropicError::StreamError(e.to_string()))?;
        let mut accumulator = StreamAccumulator::new(
            options.streaming_func.clone(),
            options.streaming_reasoning_func.clone(),
        );

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => match accumulator.handle_data(&message.data).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => {
                        source.close();
                        return Err(e);
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    source.close();
                    return Err(read_error_response(status.as_u16(), response).await);
                }
                Err(e) => {
                    source.close();
                    return Err(AnthropicError::StreamError(e.to_string()));
                }
            }
        }
        source.close();

        if !accumulator.is_finished() {
            log::warn!("anthropic stream ended before message_stop");
        }
        Ok(accumulator.into_response())
    }

    async fn generate_messages(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<ContentResponse, LLMError> {
        let payload = self.build_payload(messages, options)?;
        let response = self.create_message(&payload, options).await?;
        Ok(response_to_content(response))
    }

    async fn generate_completion(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<ContentResponse, LLMError> {
        let prompt_text = messages
            .first()
            .map(|m| {
                m.parts
                    .iter()
                    .filter_map(ContentPart::as_text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .ok_or(LLMError::EmptyResponse)?;

        let model = match options.model.clone() {
            Some(model) => model,
            None if self.model == DEFAULT_MODEL => DEFAULT_COMPLETION_MODEL.to_string(),
            None => self.model.clone(),
        };
        let payload = CompletionPayload {
            model,
            prompt: format!("\n\nHuman: {}\n\nAssistant:", prompt_text),
            max_tokens_to_sample: options.max_tokens.unwrap_or(DEFAULT_COMPLETION_MAX_TOKENS),
            stop_sequences: options.stop_words.clone(),
            temperature: options.temperature.filter(|t| *t != 0.0),
            top_p: options.top_p.filter(|p| *p != 0.0),
            top_k: options.top_k,
            stream: options.streaming_func.is_some(),
        };

        let request = self
            .client
            .post(self.url("complete"))
            .headers(self.headers(&[])?)
            .json(&payload);

        let completion = if payload.stream {
            self.stream_completion(request, options).await?
        } else {
            let res = request.send().await?;
            let status = res.status().as_u16();
            let body = res.text().await?;
            if !(200..300).contains(&status) {
                return Err(parse_error_response(status, &body).into());
            }
            serde_json::from_str::<CompletionResponse>(&body)?
        };

        Ok(ContentResponse {
            choices: vec![ContentChoice {
                content: completion.completion,
                stop_reason: completion.stop_reason.unwrap_or_default(),
                ..Default::default()
            }],
        })
    }

    async fn stream_completion(
        &self,
        request: RequestBuilder,
        options: &CallOptions,
    ) -> Result<CompletionResponse, LLMError> {
        let mut source =
            EventSource::new(request).map_err(|e| AnthropicError::StreamError(e.to_string()))?;
        let mut result = CompletionResponse::default();

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.event == "ping" || message.data.trim().is_empty() {
                        continue;
                    }
                    let chunk: CompletionResponse = serde_json::from_str(&message.data)?;
                    result.completion.push_str(&chunk.completion);
                    if chunk.stop_reason.is_some() {
                        result.stop_reason = chunk.stop_reason;
                    }
                    if !chunk.model.is_empty() {
                        result.model = chunk.model;
                    }
                    if let Some(func) = &options.streaming_func {
                        let mut func = func.lock().await;
                        if func(chunk.completion).await.is_err() {
                            source.close();
                            return Err(AnthropicError::StreamCallbackError.into());
                        }
                    }
                    if result.stop_reason.is_some() {
                        break;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    source.close();
                    return Err(read_error_response(status.as_u16(), response).await.into());
                }
                Err(e) => {
                    source.close();
                    return Err(AnthropicError::StreamError(e.to_string()).into());
                }
            }
        }
        source.close();
        Ok(result)
    }
}

#[async_trait]
impl LLM for Claude {
    async fn generate_content(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<ContentResponse, LLMError> {
        let mut call_options = self.options.clone();
        call_options.merge_options(options.clone());

        if self.use_legacy_text_completions_api {
            return self.generate_completion(messages, &call_options).await;
        }
        self.generate_messages(messages, &call_options).await
    }

    fn add_options(&mut self, options: CallOptions) {
        self.options.merge_options(options)
    }
}

/// Splits messages into Anthropic chat messages and the concatenated system prompt.
fn process_messages(
    messages: &[MessageContent],
) -> Result<(Vec<ChatMessage>, String), AnthropicError> {
    let mut chat_messages = Vec::with_capacity(messages.len());
    let mut system = String::new();

    for message in messages {
        match message.role {
            MessageType::SystemMessage => match message.parts.first() {
                Some(ContentPart::Text { text }) => system.push_str(text),
                _ => {
                    return Err(AnthropicError::InvalidContentType(
                        "system message must start with text".to_string(),
                    ))
                }
            },
            MessageType::HumanMessage => chat_messages.push(human_message(message)?),
            MessageType::AIMessage => chat_messages.push(ai_message(message)?),
            MessageType::ToolMessage => chat_messages.push(tool_message(message)?),
            MessageType::GenericMessage | MessageType::FunctionMessage => {
                return Err(AnthropicError::UnsupportedMessageType(
                    message.role.to_string(),
                ))
            }
        }
    }
    Ok((chat_messages, system))
}

fn human_message(message: &MessageContent) -> Result<ChatMessage, AnthropicError> {
    let mut content = Vec::with_capacity(message.parts.len());
    for part in &message.parts {
        match part {
            ContentPart::Text { text } => content.push(Content::text(text.clone())),
            ContentPart::Binary { mime_type, data } => content.push(Content::Image {
                source: ImageSource {
                    source_type: "base64".to_string(),
                    media_type: mime_type.clone(),
                    data: STANDARD.encode(data),
                },
                cache_control: None,
            }),
            other => {
                return Err(AnthropicError::InvalidContentType(format!(
                    "unsupported human message part: {:?}",
                    other
                )))
            }
        }
    }
    if content.is_empty() {
        return Err(AnthropicError::InvalidContentType(
            "no valid content in human message".to_string(),
        ));
    }
    Ok(ChatMessage {
        role: "user".to_string(),
        content,
    })
}

fn ai_message(message: &MessageContent) -> Result<ChatMessage, AnthropicError> {
    let mut content = Vec::with_capacity(message.parts.len());
    for part in &message.parts {
        match part {
            ContentPart::Text { text } => content.push(Content::text(text.clone())),
            ContentPart::ToolCall { tool_call } => {
                let call = tool_call.function_call.as_ref().ok_or_else(|| {
                    AnthropicError::InvalidContentType("tool call without function".to_string())
                })?;
                let input: Map<String, Value> = if call.arguments.trim().is_empty() {
                    Map::new()
                } else {
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        AnthropicError::InvalidContentType(format!(
                            "failed to parse tool call arguments: {}",
                            e
                        ))
                    })?
                };
                content.push(Content::ToolUse {
                    id: tool_call.id.clone(),
                    name: call.name.clone(),
                    input,
                    cache_control: None,
                });
            }
            other => {
                return Err(AnthropicError::InvalidContentType(format!(
                    "unsupported AI message part: {:?}",
                    other
                )))
            }
        }
    }
    if content.is_empty() {
        return Err(AnthropicError::InvalidContentType(
            "no valid content in AI message".to_string(),
        ));
    }
    Ok(ChatMessage {
        role: "assistant".to_string(),
        content,
    })
}

fn tool_message(message: &MessageContent) -> Result<ChatMessage, AnthropicError> {
    let content = message
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::ToolResponse { tool_response } => Ok(Content::ToolResult {
                tool_use_id: tool_response.tool_call_id.clone(),
                content: tool_response.content.clone(),
                cache_control: None,
            }),
            other => Err(AnthropicError::InvalidContentType(format!(
                "unsupported tool message part: {:?}",
                other
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if content.is_empty() {
        return Err(AnthropicError::InvalidContentType(
            "no valid content in tool message".to_string(),
        ));
    }
    // Tool results travel as user turns
    Ok(ChatMessage {
        role: "user".to_string(),
        content,
    })
}

/// Converts a Messages API response into choices: one per text or tool_use block.
pub fn response_to_content(response: MessageResponse) -> ContentResponse {
    let stop_reason = response.stop_reason.clone().unwrap_or_default();
    let mut generation_info = std::collections::HashMap::new();
    generation_info.insert(
        "InputTokens".to_string(),
        Value::from(response.usage.input_tokens),
    );
    generation_info.insert(
        "OutputTokens".to_string(),
        Value::from(response.usage.output_tokens),
    );
    if response.usage.cache_creation_input_tokens > 0 {
        generation_info.insert(
            "CacheCreationInputTokens".to_string(),
            Value::from(response.usage.cache_creation_input_tokens),
        );
    }
    if response.usage.cache_read_input_tokens > 0 {
        generation_info.insert(
            "CacheReadInputTokens".to_string(),
            Value::from(response.usage.cache_read_input_tokens),
        );
    }

    let mut choices = Vec::with_capacity(response.content.len());
    let mut pending_reasoning: Option<String> = None;

    for block in response.content {
        match block {
            Content::Text { text, .. } => choices.push(ContentChoice {
                content: text,
                stop_reason: stop_reason.clone(),
                generation_info: generation_info.clone(),
                reasoning_content: pending_reasoning.take(),
                ..Default::default()
            }),
            Content::Thinking { thinking, .. } => match pending_reasoning.as_mut() {
                Some(existing) => existing.push_str(&thinking),
                None => pending_reasoning = Some(thinking),
            },
            Content::ToolUse {
                id, name, input, ..
            } => choices.push(ContentChoice {
                stop_reason: stop_reason.clone(),
                generation_info: generation_info.clone(),
                tool_calls: vec![ToolCall::function(id, name, Value::Object(input).to_string())],
                ..Default::default()
            }),
            Content::RedactedThinking { .. } => {}
            Content::Image { .. } | Content::ToolResult { .. } => {
                log::debug!("ignoring request-only content block in response")
            }
        }
    }

    if let Some(reasoning) = pending_reasoning {
        choices.push(ContentChoice {
            stop_reason,
            generation_info,
            reasoning_content: Some(reasoning),
            ..Default::default()
        });
    }

    ContentResponse { choices }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::{
        language_models::{llm::generate_from_single_prompt, reasoning::ThinkingMode},
        schemas::{Tool, ToolCallResponse},
    };

    fn client(url: &str) -> Claude {
        Claude::new().with_api_key("test-key").with_base_url(url)
    }

    fn human(text: &str) -> MessageContent {
        MessageContent::text_parts(MessageType::HumanMessage, &[text])
    }

    #[test]
    fn test_build_payload_translates_roles() {
        let claude = Claude::new().with_api_key("k");
        let messages = vec![
            MessageContent::text_parts(MessageType::SystemMessage, &["You are terse. "]),
            MessageContent::text_parts(MessageType::SystemMessage, &["Answer in English."]),
            MessageContent::new(
                MessageType::HumanMessage,
                vec![
                    ContentPart::text("What is this?"),
                    ContentPart::binary("image/png", vec![0, 1, 2]),
                ],
            ),
            MessageContent::new(
                MessageType::AIMessage,
                vec![ContentPart::ToolCall {
                    tool_call: ToolCall::function("t1", "lookup", r#"{"q":"x"}"#),
                }],
            ),
            MessageContent::new(
                MessageType::ToolMessage,
                vec![ContentPart::ToolResponse {
                    tool_response: ToolCallResponse {
                        tool_call_id: "t1".into(),
                        name: "lookup".into(),
                        content: "found".into(),
                    },
                }],
            ),
        ];

        let payload = claude
            .build_payload(&messages, &CallOptions::new().with_temperature(0.0))
            .unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["system"][0]["text"], "You are terse. Answer in English.");
        assert!(json.get("temperature").is_none());
        assert!(json.get("stream").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image");
        assert_eq!(json["messages"][0]["content"][1]["source"]["data"], "AAEC");
        assert_eq!(json["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(json["messages"][1]["content"][0]["input"], json!({"q": "x"}));
        assert_eq!(json["messages"][2]["role"], "user");
        assert_eq!(json["messages"][2]["content"][0]["tool_use_id"], "t1");
    }

    #[test]
    fn test_build_payload_rejects_generic_messages() {
        let claude = Claude::new().with_api_key("k");
        let messages = [MessageContent::text_parts(MessageType::GenericMessage, &["hi"])];
        let err = claude
            .build_payload(&messages, &CallOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnthropicError::UnsupportedMessageType(_)));
    }

    #[test]
    fn test_build_payload_thinking_budget() {
        let claude = Claude::new()
            .with_api_key("k")
            .with_model("claude-3-7-sonnet-latest");

        let options = CallOptions::new()
            .with_max_tokens(8000)
            .with_temperature(0.7)
            .with_thinking_mode(ThinkingMode::Medium);
        let payload = claude.build_payload(&[human("hi")], &options).unwrap();
        let thinking = payload.thinking.unwrap();
        assert_eq!(thinking.thinking_type, "enabled");
        assert_eq!(thinking.budget_tokens, 4000);
        assert_eq!(payload.temperature, None);

        // Budget larger than max_tokens is capped
        let options = CallOptions::new()
            .with_max_tokens(4000)
            .with_thinking_budget(10_000);
        let payload = claude.build_payload(&[human("hi")], &options).unwrap();
        assert_eq!(payload.thinking.unwrap().budget_tokens, 3999);

        // Too small a budget disables thinking
        let options = CallOptions::new()
            .with_max_tokens(2000)
            .with_temperature(0.5)
            .with_thinking_mode(ThinkingMode::Low);
        let payload = claude.build_payload(&[human("hi")], &options).unwrap();
        assert!(payload.thinking.is_none());
        assert_eq!(payload.temperature, Some(0.5));
    }

    #[test]
    fn test_build_payload_ignores_thinking_for_older_models() {
        let claude = Claude::new().with_api_key("k");
        let options = CallOptions::new()
            .with_max_tokens(8000)
            .with_thinking_mode(ThinkingMode::High);
        let payload = claude.build_payload(&[human("hi")], &options).unwrap();
        assert!(payload.thinking.is_none());
    }

    #[test]
    fn test_build_payload_cache_breakpoints() {
        let claude = Claude::new()
            .with_api_key("k")
            .with_cache(CacheSettings::all());
        let messages = vec![
            MessageContent::text_parts(MessageType::SystemMessage, &["system prompt"]),
            MessageContent::text_parts(MessageType::HumanMessage, &["first", ""]),
        ];
        let options = CallOptions::new()
            .with_tools(vec![
                Tool::function("a", "first tool", json!({"type": "object"})),
                Tool::function("b", "second tool", json!({"type": "object"})),
            ])
            .with_tool_choice(ToolChoice::Tool("b".into()));
        let json = serde_json::to_value(claude.build_payload(&messages, &options).unwrap()).unwrap();

        assert_eq!(json["system"][0]["cache_control"]["type"], "ephemeral");
        assert!(json["tools"][0].get("cache_control").is_none());
        assert_eq!(json["tools"][1]["cache_control"]["type"], "ephemeral");
        assert_eq!(json["tool_choice"], json!({"type": "tool", "name": "b"}));
        // The empty trailing text block cannot be cached, so the breakpoint moves back
        assert!(json["messages"][0]["content"][1].get("cache_control").is_none());
        assert_eq!(
            json["messages"][0]["content"][0]["cache_control"]["type"],
            "ephemeral"
        );
    }

    #[test]
    fn test_response_to_content() {
        let response: MessageResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-7-sonnet-latest",
            "content": [
                {"type": "thinking", "thinking": "Let me think.", "signature": "s"},
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Paris"}},
                {"type": "redacted_thinking", "data": "xyz"},
                {"type": "thinking", "thinking": "Trailing thought", "signature": "s"}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }))
        .unwrap();

        let content = response_to_content(response);
        assert_eq!(content.choices.len(), 3);
        assert_eq!(content.choices[0].content, "Hello");
        assert_eq!(
            content.choices[0].reasoning_content.as_deref(),
            Some("Let me think.")
        );
        assert_eq!(content.choices[0].generation_info["InputTokens"], 10);
        assert_eq!(content.choices[0].generation_info["OutputTokens"], 20);
        let call = content.choices[1].tool_calls[0].function_call.as_ref().unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments, r#"{"city":"Paris"}"#);
        assert_eq!(content.choices[1].stop_reason, "tool_use");
        assert_eq!(
            content.choices[2].reasoning_content.as_deref(),
            Some("Trailing thought")
        );
    }

    #[test]
    fn test_unknown_content_type_is_rejected() {
        let result = serde_json::from_value::<MessageResponse>(json!({
            "content": [{"type": "hologram"}]
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_generate_content_messages_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", DEFAULT_API_VERSION)
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": DEFAULT_MODEL,
                "max_tokens": 2048
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "msg_1",
                    "type": "message",
                    "role": "assistant",
                    "model": DEFAULT_MODEL,
                    "content": [{"type": "text", "text": "Hello from LangChain!"}],
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 12, "output_tokens": 6}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let claude = client(&server.url());
        let out = generate_from_single_prompt(&claude, "Say hello", &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "Hello from LangChain!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_content_maps_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body(
                json!({"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server.url())
            .generate_content(&[human("hi")], &CallOptions::default())
            .await
            .unwrap_err();
        match err {
            LLMError::AnthropicError(AnthropicError::AuthenticationError(message)) => {
                assert_eq!(message, "invalid x-api-key")
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(matches!(
            parse_error_response(503, "down"),
            AnthropicError::ApiError { status: 503, .. }
        ));
        assert_eq!(
            parse_error_response(500, "boom").to_string(),
            "API returned unexpected status code: 500: boom"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_request_error() {
        // Nothing listens on the discard port.
        let err = client("http://127.0.0.1:9")
            .generate_content(&[human("hi")], &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LLMError::AnthropicError(AnthropicError::RequestError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let claude = Claude {
            api_key: None,
            ..Claude::new()
        };
        let err = claude
            .generate_content(&[human("hi")], &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LLMError::AnthropicError(AnthropicError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_generate_content_streaming() {
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_s\",\"type\":\"message\",\"role\":\"assistant\",\"model\":\"claude-3-5-sonnet-20240620\",\"usage\":{\"input_tokens\":5,\"output_tokens\":1}}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
            "event: content_block_stop\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\",\"stop_sequence\":null},\"usage\":{\"output_tokens\":2}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_body(mockito::Matcher::PartialJson(json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let chunks = Arc::new(Mutex::new(Vec::new()));
        let sink = chunks.clone();
        let options = CallOptions::new().with_streaming_func(move |chunk| {
            let sink = sink.clone();
            async move {
                sink.lock().await.push(chunk);
                Ok(())
            }
        });

        let response = client(&server.url())
            .generate_content(&[human("hi")], &options)
            .await
            .unwrap();
        assert_eq!(response.choices[0].content, "Hello");
        assert_eq!(response.choices[0].stop_reason, "end_turn");
        assert_eq!(response.choices[0].generation_info["OutputTokens"], 2);
        assert_eq!(
            chunks.lock().await.as_slice(),
            ["Hel".to_string(), "lo".to_string()]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_legacy_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/complete")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": DEFAULT_COMPLETION_MODEL,
                "prompt": "\n\nHuman: Hi there\n\nAssistant:",
                "max_tokens_to_sample": 256
            })))
            .with_status(200)
            .with_body(json!({"completion": " Hello!", "stop_reason": "stop_sequence", "model": "claude-instant-1"}).to_string())
            .create_async()
            .await;

        let claude = client(&server.url()).with_legacy_text_completions_api();
        let response = claude
            .generate_content(&[human("Hi there")], &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(response.choices[0].content, " Hello!");
        assert_eq!(response.choices[0].stop_reason, "stop_sequence");
        mock.assert_async().await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_claude_live() {
        let claude = Claude::new();
        let out = claude.invoke("Say hello").await.unwrap();
        println!("{}", out);
    }
}
