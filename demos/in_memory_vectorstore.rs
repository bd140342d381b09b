//! Similarity search over an in-memory store with OpenAI embeddings.
// To run: cargo run --example in_memory_vectorstore
// Requires OPENAI_API_KEY.

use std::collections::HashMap;

use langchain_adapters::{
    embedding::OpenAiEmbedder,
    schemas::Document,
    vectorstore::{in_memory::{InMemoryOptions, StoreBuilder}, VectorStore},
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let store = StoreBuilder::new().embedder(OpenAiEmbedder::default()).build()?;

    let city = |text: &str, country: &str| {
        Document::new(text).with_metadata(HashMap::from([("country".to_string(), json!(country))]))
    };
    let ids = store
        .add_documents(
            &[
                city("Tokyo is the capital of Japan.", "japan"),
                city("Kyoto was the imperial capital for over a thousand years.", "japan"),
                city("Paris is the capital of France.", "france"),
                city("Lyon is known for its cuisine.", "france"),
            ],
            &InMemoryOptions::default(),
        )
        .await?;
    println!("Added {} documents", ids.len());

    let results = store
        .similarity_search("capital city", 2, &InMemoryOptions::default())
        .await?;
    for doc in &results {
        println!("  {:.3} {}", doc.score, doc.page_content);
    }

    let filtered = store
        .similarity_search(
            "old capital",
            2,
            &InMemoryOptions::new()
                .with_filters(json!({"country": "japan"}))
                .with_score_threshold(0.7),
        )
        .await?;
    println!("Japan only, score >= 0.7: {} results", filtered.len());

    store.delete(&ids[..1], &InMemoryOptions::default()).await?;
    println!("After delete: {} documents", store.len());
    Ok(())
}
