mod batch;
pub mod embedder_trait;
mod error;
pub mod openai;

#[cfg(feature = "fastembed")]
mod fastembed;
#[cfg(feature = "fastembed")]
pub use self::fastembed::*;

pub use batch::*;
pub use embedder_trait::Embedder;
pub use error::EmbedderError;
pub use openai::*;
