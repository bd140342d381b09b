mod openai_embedder;
pub use openai_embedder::*;
