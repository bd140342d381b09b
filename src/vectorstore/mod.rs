mod base;
mod error;
mod options;
mod vectorstore;

pub mod in_memory;

#[cfg(feature = "chroma")]
pub mod chroma;

#[cfg(feature = "pinecone")]
pub mod pinecone;

#[cfg(feature = "weaviate")]
pub mod weaviate;

pub use base::{VectorStoreBatch, VectorStoreHelpers};
pub use error::*;
pub use options::*;
pub use vectorstore::*;
