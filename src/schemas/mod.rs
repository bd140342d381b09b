mod document;
mod llm_content;
mod messages;

pub use document::*;
pub use llm_content::*;
pub use messages::*;
