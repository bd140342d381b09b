use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embedding::{embedder_trait::Embedder, EmbedderError};

const DEFAULT_MAX_LENGTH: usize = 512;
const DEFAULT_BATCH_SIZE: usize = 256;

/// How documents are prefixed before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocEmbedType {
    #[default]
    Default,
    /// Prefix documents with `passage: ` and queries with `query: `.
    Passage,
}

impl std::str::FromStr for DocEmbedType {
    type Err = EmbedderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(DocEmbedType::Default),
            "passage" => Ok(DocEmbedType::Passage),
            other => Err(EmbedderError::InvalidOption(format!(
                "doc embed type must be 'default' or 'passage', got '{}'",
                other
            ))),
        }
    }
}

/// Embedder running a local ONNX model through fastembed.
pub struct FastEmbed {
    model: TextEmbedding,
    batch_size: Option<usize>,
    doc_embed_type: DocEmbedType,
}

/// Settings validated before a model is loaded.
#[derive(Debug, Clone)]
pub struct FastEmbedOptions {
    pub model: EmbeddingModel,
    pub max_length: usize,
    pub batch_size: usize,
    pub doc_embed_type: DocEmbedType,
    pub show_download_progress: bool,
}

impl Default for FastEmbedOptions {
    fn default() -> Self {
        FastEmbedOptions {
            model: EmbeddingModel::BGESmallENV15,
            max_length: DEFAULT_MAX_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
            doc_embed_type: DocEmbedType::Default,
            show_download_progress: false,
        }
    }
}

impl FastEmbedOptions {
    pub fn with_model(mut self, model: EmbeddingModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_doc_embed_type(mut self, doc_embed_type: DocEmbedType) -> Self {
        self.doc_embed_type = doc_embed_type;
        self
    }

    pub fn validate(&self) -> Result<(), EmbedderError> {
        if self.batch_size == 0 {
            return Err(EmbedderError::InvalidOption(
                "batch size must be greater than zero".into(),
            ));
        }
        if self.max_length == 0 {
            return Err(EmbedderError::InvalidOption(
                "max length must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl FastEmbed {
    /// Loads the model described by `options`, downloading it on first use.
    pub fn try_new(options: FastEmbedOptions) -> Result<Self, EmbedderError> {
        options.validate()?;
        let model = TextEmbedding::try_new(
            InitOptions::new(options.model.clone())
                .with_max_length(options.max_length)
                .with_show_download_progress(options.show_download_progress),
        )
        .map_err(|e| EmbedderError::FastEmbedError(e.to_string()))?;
        Ok(FastEmbed {
            model,
            batch_size: Some(options.batch_size),
            doc_embed_type: options.doc_embed_type,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f64>>, EmbedderError> {
        let expected = texts.len();
        let embeddings = self
            .model
            .embed(texts, self.batch_size)
            .map_err(|e| EmbedderError::FastEmbedError(e.to_string()))?;
        if embeddings.len() != expected {
            return Err(EmbedderError::WrongNumberOfVectors {
                expected,
                got: embeddings.len(),
            });
        }
        Ok(embeddings
            .into_iter()
            .map(|v| v.into_iter().map(f64::from).collect())
            .collect())
    }
}

impl From<TextEmbedding> for FastEmbed {
    fn from(model: TextEmbedding) -> Self {
        FastEmbed {
            model,
            batch_size: None,
            doc_embed_type: DocEmbedType::Default,
        }
    }
}

#[async_trait]
impl Embedder for FastEmbed {
    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
        let texts = match self.doc_embed_type {
            DocEmbedType::Default => documents.to_vec(),
            DocEmbedType::Passage => documents.iter().map(|d| format!("passage: {}", d)).collect(),
        };
        self.embed(texts)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f64>, EmbedderError> {
        let text = match self.doc_embed_type {
            DocEmbedType::Default => text.to_string(),
            DocEmbedType::Passage => format!("query: {}", text),
        };
        self.embed(vec![text])?
            .into_iter()
            .next()
            .ok_or(EmbedderError::WrongNumberOfVectors {
                expected: 1,
                got: 0,
            })
    }
}
