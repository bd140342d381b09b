use std::collections::{BTreeMap, HashMap};

pub use async_openai::config::{AzureConfig, Config, OpenAIConfig};
use async_openai::{
    types::{
        ChatCompletionMessageToolCall, ChatCompletionNamedToolChoice,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestMessageContentPartImage, ChatCompletionRequestMessageContentPartText,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
        CompletionUsage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FinishReason, FunctionCall, FunctionName, FunctionObject,
        ImageDetail, ImageUrl, ResponseFormat, Stop,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use crate::{
    language_models::{
        llm::LLM,
        options::{CallOptions, ToolChoice},
        reasoning::is_reasoning_model,
        LLMError,
    },
    schemas::{ContentChoice, ContentPart, ContentResponse, MessageContent, MessageType, ToolCall},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIModel {
    Gpt35,
    Gpt4,
    Gpt4Turbo,
    Gpt4o,
    Gpt4oMini,
}

impl std::fmt::Display for OpenAIModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpenAIModel::Gpt35 => "gpt-3.5-turbo",
            OpenAIModel::Gpt4 => "gpt-4",
            OpenAIModel::Gpt4Turbo => "gpt-4-turbo-preview",
            OpenAIModel::Gpt4o => "gpt-4o",
            OpenAIModel::Gpt4oMini => "gpt-4o-mini",
        };
        f.write_str(name)
    }
}

impl From<OpenAIModel> for String {
    fn from(model: OpenAIModel) -> Self {
        model.to_string()
    }
}

/// Chat completions client over `async-openai`.
#[derive(Clone)]
pub struct OpenAI<C: Config> {
    config: C,
    options: CallOptions,
    model: String,
}

impl<C: Config> OpenAI<C> {
    pub fn new(config: C) -> Self {
        Self {
            config,
            options: CallOptions::default(),
            model: OpenAIModel::Gpt4oMini.to_string(),
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_config(mut self, config: C) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for OpenAI<OpenAIConfig> {
    fn default() -> Self {
        Self::new(OpenAIConfig::default())
    }
}

#[async_trait]
impl<C: Config + Clone + Send + Sync + 'static> LLM for OpenAI<C> {
    async fn generate_content(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<ContentResponse, LLMError> {
        let mut call_options = self.options.clone();
        call_options.merge_options(options.clone());

        let client = Client::with_config(self.config.clone());
        let request = self.generate_request(messages, &call_options)?;

        if call_options.streaming_func.is_some() {
            return self.stream(&client, request, &call_options).await;
        }

        let response = client.chat().create(request).await?;
        Ok(response_to_content(response))
    }

    fn add_options(&mut self, options: CallOptions) {
        self.options.merge_options(options)
    }
}

impl<C: Config> OpenAI<C> {
    fn generate_request(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<CreateChatCompletionRequest, LLMError> {
        let model = options.model.clone().unwrap_or_else(|| self.model.clone());
        let messages = to_openai_messages(messages)?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(model.clone()).messages(messages);

        if let Some(max_tokens) = options.max_tokens {
            // Reasoning models only accept max_completion_tokens
            if is_reasoning_model(&model) {
                request_builder.max_completion_tokens(max_tokens);
            } else {
                #[allow(deprecated)]
                request_builder.max_tokens(max_tokens);
            }
        }
        if let Some(temperature) = options.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            request_builder.top_p(top_p);
        }
        if let Some(stop_words) = &options.stop_words {
            request_builder.stop(Stop::StringArray(stop_words.clone()));
        }
        if let Some(n) = options.n.or(options.candidate_count) {
            request_builder.n(n.min(u8::MAX as usize) as u8);
        }
        if let Some(seed) = options.seed {
            request_builder.seed(seed as i64);
        }
        if let Some(frequency_penalty) = options.frequency_penalty {
            request_builder.frequency_penalty(frequency_penalty);
        }
        if let Some(presence_penalty) = options.presence_penalty {
            request_builder.presence_penalty(presence_penalty);
        }
        if options.json_mode {
            request_builder.response_format(ResponseFormat::JsonObject);
        }
        if let Some(tools) = &options.tools {
            let tools = tools
                .iter()
                .filter_map(|t| t.function.as_ref())
                .map(|f| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: f.name.clone(),
                        description: Some(f.description.clone()),
                        parameters: Some(f.parameters.clone()),
                        strict: f.strict.then_some(true),
                    },
                })
                .collect::<Vec<_>>();
            if !tools.is_empty() {
                request_builder.tools(tools);
            }
        }
        if let Some(choice) = &options.tool_choice {
            request_builder.tool_choice(match choice {
                ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
                ToolChoice::Any => ChatCompletionToolChoiceOption::Required,
                ToolChoice::None => ChatCompletionToolChoiceOption::None,
                ToolChoice::Tool(name) => {
                    ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionName { name: name.clone() },
                    })
                }
            });
        }
        if options.streaming_func.is_some() {
            request_builder.stream(true);
        }

        Ok(request_builder.build()?)
    }

    async fn stream(
        &self,
        client: &Client<C>,
        request: CreateChatCompletionRequest,
        options: &CallOptions,
    ) -> Result<ContentResponse, LLMError> {
        let mut stream = client.chat().create_stream(request).await?;

        let mut content = String::new();
        let mut stop_reason = String::new();
        let mut usage: Option<CompletionUsage> = None;
        // Tool call fragments arrive keyed by index
        let mut tool_calls: BTreeMap<u32, (String, String, String)> = BTreeMap::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            for choice in chunk.choices {
                if let Some(text) = choice.delta.content {
                    content.push_str(&text);
                    if let Some(func) = &options.streaming_func {
                        let mut func = func.lock().await;
                        func(text).await.map_err(|_| {
                            LLMError::OtherError("streaming callback failed".to_string())
                        })?;
                    }
                }
                for call in choice.delta.tool_calls.unwrap_or_default() {
                    let entry = tool_calls.entry(call.index).or_default();
                    if let Some(id) = call.id {
                        entry.0 = id;
                    }
                    if let Some(function) = call.function {
                        if let Some(name) = function.name {
                            entry.1.push_str(&name);
                        }
                        if let Some(arguments) = function.arguments {
                            entry.2.push_str(&arguments);
                        }
                    }
                }
                if let Some(reason) = choice.finish_reason {
                    stop_reason = finish_reason_str(reason).to_string();
                }
            }
        }

        Ok(ContentResponse {
            choices: vec![ContentChoice {
                content,
                stop_reason,
                generation_info: usage.map(usage_info).unwrap_or_default(),
                tool_calls: tool_calls
                    .into_values()
                    .map(|(id, name, arguments)| ToolCall::function(id, name, arguments))
                    .collect(),
                ..Default::default()
            }],
        })
    }
}

fn to_openai_messages(
    messages: &[MessageContent],
) -> Result<Vec<ChatCompletionRequestMessage>, LLMError> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            MessageType::SystemMessage => out.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(joined_text(&message.parts))
                    .build()?
                    .into(),
            ),
            MessageType::HumanMessage => {
                let parts = message
                    .parts
                    .iter()
                    .map(user_part)
                    .collect::<Result<Vec<_>, _>>()?;
                out.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(parts)
                        .build()?
                        .into(),
                )
            }
            MessageType::AIMessage => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                let text = joined_text(&message.parts);
                if !text.is_empty() {
                    builder.content(text);
                }
                let calls = message
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::ToolCall { tool_call } => Some(tool_call),
                        _ => None,
                    })
                    .filter_map(|call| {
                        call.function_call
                            .as_ref()
                            .map(|f| ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: f.name.clone(),
                                    arguments: f.arguments.clone(),
                                },
                            })
                    })
                    .collect::<Vec<_>>();
                if !calls.is_empty() {
                    builder.tool_calls(calls);
                }
                out.push(builder.build()?.into())
            }
            MessageType::ToolMessage => {
                for part in &message.parts {
                    match part {
                        ContentPart::ToolResponse { tool_response } => out.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(tool_response.tool_call_id.clone())
                                .content(tool_response.content.clone())
                                .build()?
                                .into(),
                        ),
                        other => {
                            return Err(LLMError::OtherError(format!(
                                "unsupported tool message part: {:?}",
                                other
                            )))
                        }
                    }
                }
            }
            MessageType::GenericMessage | MessageType::FunctionMessage => {
                return Err(LLMError::OtherError(format!(
                    "role {} not supported",
                    message.role
                )))
            }
        }
    }
    Ok(out)
}

fn joined_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(ContentPart::as_text)
        .collect::<Vec<_>>()
        .join("")
}

fn user_part(part: &ContentPart) -> Result<ChatCompletionRequestUserMessageContentPart, LLMError> {
    match part {
        ContentPart::Text { text } => Ok(ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText { text: text.clone() },
        )),
        ContentPart::ImageUrl { url, detail } => Ok(
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: url.clone(),
                        detail: detail.as_deref().map(image_detail),
                    },
                },
            ),
        ),
        ContentPart::Binary { mime_type, data } => {
            use base64::{engine::general_purpose::STANDARD, Engine};
            Ok(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", mime_type, STANDARD.encode(data)),
                        detail: None,
                    },
                },
            ))
        }
        other => Err(LLMError::OtherError(format!(
            "unsupported human message part: {:?}",
            other
        ))),
    }
}

fn image_detail(detail: &str) -> ImageDetail {
    match detail {
        "low" => ImageDetail::Low,
        "high" => ImageDetail::High,
        _ => ImageDetail::Auto,
    }
}

fn finish_reason_str(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::FunctionCall => "function_call",
    }
}

fn usage_info(usage: CompletionUsage) -> HashMap<String, Value> {
    let mut info = HashMap::new();
    info.insert("PromptTokens".to_string(), Value::from(usage.prompt_tokens));
    info.insert(
        "CompletionTokens".to_string(),
        Value::from(usage.completion_tokens),
    );
    info.insert("TotalTokens".to_string(), Value::from(usage.total_tokens));
    if let Some(reasoning) = usage
        .completion_tokens_details
        .and_then(|d| d.reasoning_tokens)
    {
        info.insert("ReasoningTokens".to_string(), Value::from(reasoning));
    }
    info
}

fn response_to_content(response: CreateChatCompletionResponse) -> ContentResponse {
    let generation_info = response.usage.map(usage_info).unwrap_or_default();
    let choices = response
        .choices
        .into_iter()
        .map(|choice| ContentChoice {
            content: choice.message.content.unwrap_or_default(),
            stop_reason: choice
                .finish_reason
                .map(finish_reason_str)
                .unwrap_or_default()
                .to_string(),
            generation_info: generation_info.clone(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|c| ToolCall::function(c.id, c.function.name, c.function.arguments))
                .collect(),
            ..Default::default()
        })
        .collect();
    ContentResponse { choices }
}
