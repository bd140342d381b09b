//! Streams a Claude answer that calls a tool, then sends the tool result back.
// To run: cargo run --example anthropic_tool_call_stream
// Requires ANTHROPIC_API_KEY.

use std::io::Write;

use langchain_adapters::{
    language_models::{llm::LLM, options::CallOptions},
    llm::claude::Claude,
    schemas::{ContentPart, MessageContent, MessageType, Tool, ToolCallResponse},
};
use serde_json::json;

fn weather_tool() -> Tool {
    Tool::function(
        "get_current_weather",
        "Get the current weather in a given location",
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and state, e.g. San Francisco, CA"
                }
            },
            "required": ["location"]
        }),
    )
}

fn lookup_weather(arguments: &str) -> String {
    let location = serde_json::from_str::<serde_json::Value>(arguments)
        .ok()
        .and_then(|v| v["location"].as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    json!({"location": location, "temperature": "21", "unit": "celsius"}).to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let llm = Claude::new();
    let options = CallOptions::new()
        .with_max_tokens(1024)
        .with_tools(vec![weather_tool()])
        .with_streaming_func(|chunk| async move {
            print!("{}", chunk);
            std::io::stdout().flush().map_err(|_| ())
        });

    let mut messages = vec![MessageContent::text_parts(
        MessageType::HumanMessage,
        &["What is the weather like in Boston?"],
    )];

    let response = llm.generate_content(&messages, &options).await?;
    println!();
    let choice = response.choices.first().ok_or("no choices returned")?;

    if choice.tool_calls.is_empty() {
        println!("Model answered without calling a tool.");
        return Ok(());
    }

    let mut assistant_parts = Vec::new();
    if !choice.content.is_empty() {
        assistant_parts.push(ContentPart::text(choice.content.clone()));
    }
    let mut tool_parts = Vec::new();
    for call in &choice.tool_calls {
        let Some(function) = &call.function_call else {
            continue;
        };
        println!("Tool call {}: {}({})", call.id, function.name, function.arguments);
        assistant_parts.push(ContentPart::ToolCall {
            tool_call: call.clone(),
        });
        tool_parts.push(ContentPart::ToolResponse {
            tool_response: ToolCallResponse {
                tool_call_id: call.id.clone(),
                name: function.name.clone(),
                content: lookup_weather(&function.arguments),
            },
        });
    }
    messages.push(MessageContent::new(MessageType::AIMessage, assistant_parts));
    messages.push(MessageContent::new(MessageType::ToolMessage, tool_parts));

    llm.generate_content(&messages, &options).await?;
    println!();
    Ok(())
}
