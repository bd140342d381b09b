use async_trait::async_trait;

use crate::schemas::{ContentResponse, MessageContent, MessageType};

use super::{options::CallOptions, LLMError};

#[async_trait]
pub trait LLM: Sync + Send + LLMClone {
    /// Sends a multi-part conversation to the model.
    ///
    /// `options` are merged over the client's own defaults for this call only.
    async fn generate_content(
        &self,
        messages: &[MessageContent],
        options: &CallOptions,
    ) -> Result<ContentResponse, LLMError>;

    async fn invoke(&self, prompt: &str) -> Result<String, LLMError> {
        let messages = [MessageContent::text_parts(
            MessageType::HumanMessage,
            &[prompt],
        )];
        let response = self
            .generate_content(&messages, &CallOptions::default())
            .await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.content)
            .ok_or(LLMError::EmptyResponse)
    }

    /// This is usefull when you want to override the client's default options
    fn add_options(&mut self, _options: CallOptions) {
        // No action taken
    }
}

/// Calls `llm` with a single human prompt and returns the first choice's text.
pub async fn generate_from_single_prompt(
    llm: &dyn LLM,
    prompt: &str,
    options: &CallOptions,
) -> Result<String, LLMError> {
    let messages = [MessageContent::text_parts(
        MessageType::HumanMessage,
        &[prompt],
    )];
    let response = llm.generate_content(&messages, options).await?;
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.content)
        .ok_or(LLMError::EmptyResponse)
}

pub trait LLMClone {
    fn clone_box(&self) -> Box<dyn LLM>;
}

impl<T> LLMClone for T
where
    T: 'static + LLM + Clone,
{
    fn clone_box(&self) -> Box<dyn LLM> {
        Box::new(self.clone())
    }
}

impl<L> From<L> for Box<dyn LLM>
where
    L: 'static + LLM,
{
    fn from(llm: L) -> Self {
        Box::new(llm)
    }
}
