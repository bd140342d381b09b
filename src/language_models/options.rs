use std::collections::HashMap;
use std::{pin::Pin, sync::Arc};

use futures::Future;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::schemas::Tool;

use super::reasoning::{ReasoningOptions, ThinkingMode};

pub type StreamingFunc =
    Arc<Mutex<dyn FnMut(String) -> Pin<Box<dyn Future<Output = Result<(), ()>> + Send>> + Send>>;

/// Which tool, if any, the model is asked to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    /// The model must call one of the provided tools.
    Any,
    None,
    Tool(String),
}

#[derive(Clone, Default)]
pub struct CallOptions {
    pub model: Option<String>,
    pub candidate_count: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop_words: Option<Vec<String>>,
    pub streaming_func: Option<StreamingFunc>,
    /// Receives reasoning/thinking chunks while streaming.
    pub streaming_reasoning_func: Option<StreamingFunc>,
    pub top_k: Option<usize>,
    pub top_p: Option<f32>,
    pub seed: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub n: Option<usize>,
    pub repetition_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub json_mode: bool,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub reasoning: Option<ReasoningOptions>,
    pub metadata: HashMap<String, Value>,
}

impl std::fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOptions")
            .field("model", &self.model)
            .field("candidate_count", &self.candidate_count)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("stop_words", &self.stop_words)
            .field(
                "streaming_func",
                &self.streaming_func.as_ref().map(|_| "..."),
            )
            .field(
                "streaming_reasoning_func",
                &self.streaming_reasoning_func.as_ref().map(|_| "..."),
            )
            .field("top_k", &self.top_k)
            .field("top_p", &self.top_p)
            .field("seed", &self.seed)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("n", &self.n)
            .field("repetition_penalty", &self.repetition_penalty)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("presence_penalty", &self.presence_penalty)
            .field("json_mode", &self.json_mode)
            .field("tools", &self.tools)
            .field("tool_choice", &self.tool_choice)
            .field("reasoning", &self.reasoning)
            .field("metadata", &self.metadata)
            .finish()
    }
}

fn boxed_streaming_func<F, Fut>(mut func: F) -> StreamingFunc
where
    F: FnMut(String) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ()>> + Send + 'static,
{
    Arc::new(Mutex::new(
        move |s: String| -> Pin<Box<dyn Future<Output = Result<(), ()>> + Send>> {
            Box::pin(func(s))
        },
    ))
}

impl CallOptions {
    pub fn new() -> Self {
        CallOptions::default()
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_candidate_count(mut self, candidate_count: usize) -> Self {
        self.candidate_count = Some(candidate_count);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_stop_words(mut self, stop_words: Vec<String>) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    // The closure owns each chunk so it can be stored behind Arc<Mutex<..>>.
    pub fn with_streaming_func<F, Fut>(mut self, func: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ()>> + Send + 'static,
    {
        self.streaming_func = Some(boxed_streaming_func(func));
        self
    }

    pub fn with_streaming_reasoning_func<F, Fut>(mut self, func: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ()>> + Send + 'static,
    {
        self.streaming_reasoning_func = Some(boxed_streaming_func(func));
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_seed(mut self, seed: usize) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_repetition_penalty(mut self, repetition_penalty: f32) -> Self {
        self.repetition_penalty = Some(repetition_penalty);
        self
    }

    pub fn with_frequency_penalty(mut self, frequency_penalty: f32) -> Self {
        self.frequency_penalty = Some(frequency_penalty);
        self
    }

    pub fn with_presence_penalty(mut self, presence_penalty: f32) -> Self {
        self.presence_penalty = Some(presence_penalty);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn with_reasoning(mut self, reasoning: ReasoningOptions) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    /// Shorthand for enabling thinking with the given mode.
    pub fn with_thinking_mode(mut self, mode: ThinkingMode) -> Self {
        let mut reasoning = self.reasoning.take().unwrap_or_default();
        reasoning.mode = mode;
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_thinking_budget(mut self, budget_tokens: u32) -> Self {
        let mut reasoning = self.reasoning.take().unwrap_or_default();
        reasoning.budget_tokens = Some(budget_tokens);
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn merge_options(&mut self, incoming_options: CallOptions) {
        // Scalars: prefer the incoming value when set
        self.model = incoming_options.model.or(self.model.take());
        self.candidate_count = incoming_options.candidate_count.or(self.candidate_count);
        self.max_tokens = incoming_options.max_tokens.or(self.max_tokens);
        self.temperature = incoming_options.temperature.or(self.temperature);
        self.top_k = incoming_options.top_k.or(self.top_k);
        self.top_p = incoming_options.top_p.or(self.top_p);
        self.seed = incoming_options.seed.or(self.seed);
        self.min_length = incoming_options.min_length.or(self.min_length);
        self.max_length = incoming_options.max_length.or(self.max_length);
        self.n = incoming_options.n.or(self.n);
        self.repetition_penalty = incoming_options
            .repetition_penalty
            .or(self.repetition_penalty);
        self.frequency_penalty = incoming_options
            .frequency_penalty
            .or(self.frequency_penalty);
        self.presence_penalty = incoming_options.presence_penalty.or(self.presence_penalty);
        self.json_mode = incoming_options.json_mode || self.json_mode;
        self.tool_choice = incoming_options.tool_choice.or(self.tool_choice.take());
        self.reasoning = incoming_options.reasoning.or(self.reasoning.take());

        if let Some(mut new_stop_words) = incoming_options.stop_words {
            if let Some(existing_stop_words) = &mut self.stop_words {
                existing_stop_words.append(&mut new_stop_words);
            } else {
                self.stop_words = Some(new_stop_words);
            }
        }

        if let Some(mut incoming_tools) = incoming_options.tools {
            if let Some(existing_tools) = &mut self.tools {
                existing_tools.append(&mut incoming_tools);
            } else {
                self.tools = Some(incoming_tools);
            }
        }

        self.metadata.extend(incoming_options.metadata);

        // Incoming callbacks replace existing ones
        self.streaming_func = incoming_options
            .streaming_func
            .or_else(|| self.streaming_func.clone());
        self.streaming_reasoning_func = incoming_options
            .streaming_reasoning_func
            .or_else(|| self.streaming_reasoning_func.clone());
    }
}
