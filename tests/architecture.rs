//! Architecture tests
//!
//! Tests to verify the public module layout and error unification.

use std::collections::HashMap;
use std::sync::Arc;

use langchain_adapters::error::{error_info, ErrorCode, LangChainError};

#[test]
fn test_error_unification() {
    let memory_error = langchain_adapters::memory::MemoryError::InvalidInputValues("0 keys".into());
    let langchain_error: LangChainError = memory_error.into();

    match langchain_error {
        LangChainError::MemoryError(_) => {}
        _ => panic!("Expected MemoryError variant"),
    }
}

#[test]
fn test_error_code_system() {
    let error = LangChainError::ConfigurationError("test".to_string());
    let code = ErrorCode::from_error(&error);
    assert_eq!(code, ErrorCode::ConfigurationError);
    assert_eq!(code.as_u32(), 9000);

    let error: LangChainError =
        langchain_adapters::vectorstore::VectorStoreError::DeleteNotSupported.into();
    let code = ErrorCode::from_error(&error).as_u32();
    assert!((3000..4000).contains(&code));
}

#[test]
fn test_error_info() {
    let error = LangChainError::ConfigurationError("test config".to_string());
    let info = error_info(&error);
    assert!(info.contains("E9000"));
    assert!(info.contains("test config"));
}

#[test]
fn test_utils_similarity() {
    use langchain_adapters::utils::cosine_similarity;

    let similarity = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
    assert!((similarity - 1.0).abs() < 1e-10);
}

#[tokio::test]
async fn test_memory_behind_type_alias() {
    use langchain_adapters::memory::{BaseMemory, ConversationBuffer};
    use langchain_adapters::{Memory, Messages};

    let memory: Memory = Arc::new(ConversationBuffer::new());
    let inputs = HashMap::from([("input".to_string(), serde_json::json!("hi"))]);
    let outputs = HashMap::from([("output".to_string(), serde_json::json!("hello"))]);
    memory.save_context(&inputs, &outputs).await.unwrap();

    let vars = memory.load_memory_variables(&HashMap::new()).await.unwrap();
    assert_eq!(vars["history"].as_text(), Some("Human: hi\nAI: hello"));

    let _messages: Messages = vec![];
}

#[test]
fn test_llms_are_boxable() {
    use langchain_adapters::language_models::llm::LLM;
    use langchain_adapters::llm::{Claude, OpenAI};

    let llms: Vec<Box<dyn LLM>> = vec![
        Claude::new().with_api_key("test").into(),
        OpenAI::default().into(),
    ];
    assert_eq!(llms.len(), 2);
}
