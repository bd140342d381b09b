//! Multi-turn chat with OpenAI using message history.
// To run: cargo run --example openai_chat
// Requires OPENAI_API_KEY.

use langchain_adapters::{
    language_models::{llm::LLM, options::CallOptions},
    llm::openai::{OpenAI, OpenAIModel},
    memory::{ChatMessageHistory, SimpleChatMessageHistory},
    schemas::{Message, MessageContent},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let llm = OpenAI::default().with_model(OpenAIModel::Gpt4oMini.to_string());
    let history = SimpleChatMessageHistory::new();
    history
        .add_message(Message::new_system_message(
            "You are a concise assistant. Answer in one sentence.",
        ))
        .await?;

    for question in ["What is Rust's ownership model?", "How does borrowing relate to it?"] {
        history.add_user_message(question).await?;
        let messages: Vec<MessageContent> = history
            .messages()
            .await?
            .iter()
            .map(MessageContent::from)
            .collect();

        let response = llm.generate_content(&messages, &CallOptions::new()).await?;
        let answer = response
            .choices
            .first()
            .map(|c| c.content.clone())
            .unwrap_or_default();
        println!("Q: {}\nA: {}\n", question, answer);
        history.add_ai_message(&answer).await?;
    }
    Ok(())
}
