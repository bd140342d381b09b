use async_openai::{
    config::{Config, OpenAIConfig},
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use async_trait::async_trait;

use crate::embedding::{
    batch_texts, embedder_trait::Embedder, maybe_remove_newlines, EmbedderError,
    DEFAULT_BATCH_SIZE, DEFAULT_STRIP_NEW_LINES,
};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder<C: Config> {
    config: C,
    model: String,
    dimensions: Option<u32>,
    batch_size: usize,
    strip_new_lines: bool,
}

impl<C: Config + Send + Sync> OpenAiEmbedder<C> {
    pub fn new(config: C) -> Self {
        OpenAiEmbedder {
            config,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: None,
            batch_size: DEFAULT_BATCH_SIZE,
            strip_new_lines: DEFAULT_STRIP_NEW_LINES,
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

    /// Requests shortened vectors (text-embedding-3 models only).
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_strip_new_lines(mut self, strip_new_lines: bool) -> Self {
        self.strip_new_lines = strip_new_lines;
        self
    }
}

impl Default for OpenAiEmbedder<OpenAIConfig> {
    fn default() -> Self {
        OpenAiEmbedder::new(OpenAIConfig::default())
    }
}

impl<C: Config + Clone + Send + Sync> OpenAiEmbedder<C> {
    async fn create_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>, EmbedderError> {
        let client = Client::with_config(self.config.clone());
        let expected = texts.len();

        let mut builder = CreateEmbeddingRequestArgs::default();
        builder
            .model(self.model.clone())
            .input(EmbeddingInput::StringArray(texts));
        if let Some(dimensions) = self.dimensions {
            builder.dimensions(dimensions);
        }
        let request = builder.build()?;

        let mut response = client.embeddings().create(request).await?;
        if response.data.len() != expected {
            return Err(EmbedderError::WrongNumberOfVectors {
                expected,
                got: response.data.len(),
            });
        }
        response.data.sort_by_key(|d| d.index);

        Ok(response
            .data
            .into_iter()
            .map(|d| d.embedding.into_iter().map(f64::from).collect())
            .collect())
    }
}

#[async_trait]
impl<C: Config + Clone + Send + Sync> Embedder for OpenAiEmbedder<C> {
    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
        let texts = maybe_remove_newlines(documents, self.strip_new_lines);
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in batch_texts(&texts, self.batch_size) {
            if batch.is_empty() {
                continue;
            }
            embeddings.extend(self.create_embeddings(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedderError> {
        let text = if self.strip_new_lines {
            text.replace('\n', " ")
        } else {
            text.to_string()
        };
        self.create_embeddings(vec![text])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedderError::WrongNumberOfVectors {
                expected: 1,
                got: 0,
            })
    }
}
