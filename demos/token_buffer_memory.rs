//! Keeps a conversation under a token limit with different trim strategies.
// To run: cargo run --example token_buffer_memory
// No API key required.

use std::collections::HashMap;

use langchain_adapters::memory::{BaseMemory, EnhancedTokenBuffer, TrimStrategy};
use serde_json::json;

async fn fill(memory: &EnhancedTokenBuffer) -> Result<(), Box<dyn std::error::Error>> {
    let turns = [
        ("Hi, I'm planning a trip to Japan.", "Great! When are you going?"),
        ("In April, for the cherry blossoms.", "April is peak season, book early."),
        ("Which cities should I visit?", "Tokyo, Kyoto and Osaka are a classic route."),
        ("How do I travel between them?", "The shinkansen connects all three."),
    ];
    for (input, output) in turns {
        memory
            .save_context(
                &HashMap::from([("input".to_string(), json!(input))]),
                &HashMap::from([("output".to_string(), json!(output))]),
            )
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    for strategy in [
        TrimStrategy::TrimOldest,
        TrimStrategy::TrimMiddle,
        TrimStrategy::TrimByImportance,
    ] {
        let memory = EnhancedTokenBuffer::new()
            .with_token_limit(60)
            .with_trim_strategy(strategy)
            .with_input_key("input")
            .with_output_key("output");
        fill(&memory).await?;

        println!("== {} ({} tokens) ==", strategy, memory.get_token_count().await?);
        println!("{}\n", memory.get_memory_string().await?);
    }
    Ok(())
}
