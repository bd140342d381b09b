//! Single-prompt completion against Claude.
// To run: cargo run --example anthropic_completion
// Requires ANTHROPIC_API_KEY.

use langchain_adapters::{
    language_models::{generate_from_single_prompt, options::CallOptions},
    llm::claude::Claude,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let llm = Claude::new().with_model("claude-3-5-haiku-20241022");
    let options = CallOptions::new().with_max_tokens(256).with_temperature(0.2);

    let answer = generate_from_single_prompt(
        &llm,
        "Name three tallest mountains in the world, one per line.",
        &options,
    )
    .await?;
    println!("{}", answer);
    Ok(())
}
