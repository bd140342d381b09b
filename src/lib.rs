//! # langchain-adapters
//!
//! Uniform abstractions over LLM providers, embedders, vector stores and
//! conversation memory, in the style of [LangChain](https://github.com/langchain-ai/langchain).
//!
//! ## Overview
//!
//! - **LLMs**: Anthropic (messages and legacy completions, SSE streaming, tool calls, extended thinking) and OpenAI
//! - **Embeddings**: OpenAI, FastEmbed (feature `fastembed`)
//! - **Vector stores**: in-memory, Chroma, Pinecone, Weaviate (features `chroma`, `pinecone`, `weaviate`)
//! - **Memory**: conversation, window and token-limited buffers over in-process, file, SQLite, MongoDB or Redis histories
//!
//! ## Example
//!
//! ```ignore
//! use langchain_adapters::language_models::llm::LLM;
//! use langchain_adapters::llm::Claude;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let claude = Claude::default();
//! let answer = claude.invoke("Hello, Claude!").await?;
//! println!("{answer}");
//! # Ok(()) }
//! ```

/// Embedding models (OpenAI, FastEmbed).
pub mod embedding;
/// Unified error types and error codes.
pub mod error;
/// Common LLM traits, call options and provider error mapping.
pub mod language_models;
/// LLM implementations: Claude, OpenAI.
pub mod llm;
/// Chat message histories and conversation memories.
pub mod memory;
/// Schemas: messages, multi-part content, documents.
pub mod schemas;
/// Utilities: similarity.
pub mod utils;
/// Vector stores: in-memory, Chroma, Pinecone, Weaviate (feature-gated).
pub mod vectorstore;

pub use url;

use std::sync::Arc;

/// Type alias for a shared memory
pub type Memory = Arc<dyn crate::memory::BaseMemory>;

/// Type alias for message list
pub type Messages = Vec<crate::schemas::Message>;

/// Type alias for embedding vector (f64)
pub type Embedding = Vec<f64>;

/// Type alias for document list
pub type Documents = Vec<crate::schemas::Document>;
