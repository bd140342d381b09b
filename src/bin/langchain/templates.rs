//! Project templates used by `langchain init`.

pub struct ProjectTemplate {
    pub name: &'static str,
    pub description: &'static str,
    /// `(relative path, contents)` pairs.
    pub files: &'static [(&'static str, &'static str)],
    pub instructions: &'static str,
}

pub const TEMPLATES: &[ProjectTemplate] = &[
    ProjectTemplate {
        name: "basic-llm",
        description: "Simple LLM completion example",
        files: &[
            ("Cargo.toml", CARGO_TOML),
            ("src/main.rs", BASIC_LLM_MAIN),
            ("README.md", BASIC_LLM_README),
            (".env.example", ENV_EXAMPLE),
        ],
        instructions: "Set your API keys in .env file (copy from .env.example)",
    },
    ProjectTemplate {
        name: "chat-bot",
        description: "Interactive chat bot with conversation memory",
        files: &[
            ("Cargo.toml", CARGO_TOML),
            ("src/main.rs", CHAT_BOT_MAIN),
            ("README.md", CHAT_BOT_README),
            (".env.example", ENV_EXAMPLE),
        ],
        instructions: "Interactive chat bot. Set API keys and run to start chatting!",
    },
    ProjectTemplate {
        name: "rag-system",
        description: "Retrieval-augmented generation over local documents",
        files: &[
            ("Cargo.toml", CARGO_TOML),
            ("src/main.rs", RAG_MAIN),
            ("README.md", RAG_README),
            (".env.example", ENV_EXAMPLE),
            ("documents/sample.txt", SAMPLE_DOCUMENT),
        ],
        instructions: "Add your documents to the 'documents' directory before running.",
    },
    ProjectTemplate {
        name: "anthropic-llm",
        description: "Claude completion with streaming output",
        files: &[
            ("Cargo.toml", CARGO_TOML),
            ("src/main.rs", ANTHROPIC_LLM_MAIN),
            ("README.md", ANTHROPIC_LLM_README),
            (".env.example", ANTHROPIC_ENV_EXAMPLE),
        ],
        instructions: "Set your ANTHROPIC_API_KEY in .env file (copy from .env.example)",
    },
];

pub fn find_template(name: &str) -> Option<&'static ProjectTemplate> {
    TEMPLATES.iter().find(|t| t.name == name)
}

pub fn template_names() -> Vec<&'static str> {
    TEMPLATES.iter().map(|t| t.name).collect()
}

/// Substitutes `{{project_name}}` and `{{crate_name}}`.
pub fn render(content: &str, project_name: &str) -> String {
    content
        .replace("{{project_name}}", project_name)
        .replace("{{crate_name}}", &crate_name(project_name))
}

/// Rust identifier form of a package name.
pub fn crate_name(project_name: &str) -> String {
    project_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

const CARGO_TOML: &str = r#"[package]
name = "{{project_name}}"
version = "0.1.0"
edition = "2021"

[dependencies]
langchain-adapters = "0.1"
tokio = { version = "1", features = ["full"] }
dotenv = "0.15"
serde_json = "1.0"
"#;

const ENV_EXAMPLE: &str = "OPENAI_API_KEY=your-openai-api-key
ANTHROPIC_API_KEY=your-anthropic-api-key
";

const ANTHROPIC_ENV_EXAMPLE: &str = "ANTHROPIC_API_KEY=your-anthropic-api-key
";

const BASIC_LLM_MAIN: &str = r#"use langchain_adapters::language_models::llm::LLM;
use langchain_adapters::llm::OpenAI;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if std::env::var("OPENAI_API_KEY").is_err() {
        eprintln!("Error: OPENAI_API_KEY environment variable is not set");
        eprintln!("\nTo set it:");
        eprintln!("  export OPENAI_API_KEY='your-api-key-here'");
        eprintln!("\nOr create a .env file (see .env.example)");
        std::process::exit(1);
    }

    let llm = OpenAI::default();
    let prompt = "What are the key benefits of using Rust for AI applications?";
    println!("Prompt: {}\n", prompt);

    match llm.invoke(prompt).await {
        Ok(answer) => println!("Response: {}", answer),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
"#;

const BASIC_LLM_README: &str = "# {{project_name}}

A minimal LLM completion project generated by `langchain init`.

## Running

```sh
cp .env.example .env
cargo run
```
";

const CHAT_BOT_MAIN: &str = r#"use std::io::{self, BufRead, Write};

use langchain_adapters::language_models::{llm::LLM, options::CallOptions};
use langchain_adapters::llm::OpenAI;
use langchain_adapters::memory::{ChatMessageHistory, SimpleChatMessageHistory};
use langchain_adapters::schemas::{Message, MessageContent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let llm = OpenAI::default();
    let history = SimpleChatMessageHistory::new();
    history
        .add_message(Message::new_system_message("You are a helpful assistant."))
        .await?;

    println!("{{project_name}} chat bot");
    println!("Type 'quit' to exit\n");

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input == "quit" {
            break;
        }

        history.add_user_message(input).await?;
        let messages: Vec<MessageContent> = history
            .messages()
            .await?
            .iter()
            .map(MessageContent::from)
            .collect();

        match llm.generate_content(&messages, &CallOptions::default()).await {
            Ok(response) => {
                let reply = response
                    .choices
                    .first()
                    .map(|c| c.content.clone())
                    .unwrap_or_default();
                println!("Bot: {}\n", reply);
                history.add_ai_message(&reply).await?;
            }
            Err(e) => println!("Error: {}\n", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}
"#;

const CHAT_BOT_README: &str = "# {{project_name}}

An interactive chat bot that keeps the conversation in memory.

## Running

```sh
cp .env.example .env
cargo run
```
";

const RAG_MAIN: &str = r#"use std::fs;

use langchain_adapters::embedding::OpenAiEmbedder;
use langchain_adapters::language_models::llm::LLM;
use langchain_adapters::llm::OpenAI;
use langchain_adapters::schemas::Document;
use langchain_adapters::vectorstore::in_memory::{InMemoryOptions, StoreBuilder};
use langchain_adapters::vectorstore::VectorStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let store = StoreBuilder::new()
        .embedder(OpenAiEmbedder::default())
        .build()?;

    println!("Loading documents...");
    let mut docs = Vec::new();
    for entry in fs::read_dir("documents")? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            for chunk in fs::read_to_string(&path)?.split("\n\n") {
                if !chunk.trim().is_empty() {
                    docs.push(Document::new(chunk.trim()));
                }
            }
        }
    }
    store.add_documents(&docs, &InMemoryOptions::default()).await?;
    println!("Indexed {} chunks", docs.len());

    let question = "What is LangChain used for?";
    let context: Vec<String> = store
        .similarity_search(question, 3, &InMemoryOptions::default())
        .await?
        .into_iter()
        .map(|d| d.page_content)
        .collect();

    let prompt = format!(
        "Answer the question using the context.\n\nContext:\n{}\n\nQuestion: {}",
        context.join("\n---\n"),
        question
    );
    let answer = OpenAI::default().invoke(&prompt).await?;
    println!("Q: {}\nA: {}", question, answer);
    Ok(())
}
"#;

const RAG_README: &str = "# {{project_name}}

Retrieval-augmented generation over the text files in `documents/`.

## Running

```sh
cp .env.example .env
cargo run
```
";

const SAMPLE_DOCUMENT: &str = "LangChain is a framework for developing applications powered by language models.

It connects models to sources of context such as documents and databases, and lets them reason about how to answer.

Retrieval-augmented generation looks up relevant passages in a vector store and passes them to the model with the question.
";

const ANTHROPIC_LLM_MAIN: &str = r#"use langchain_adapters::language_models::{llm::LLM, options::CallOptions};
use langchain_adapters::llm::Claude;
use langchain_adapters::schemas::{MessageContent, MessageType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let claude = Claude::default();
    let messages = [MessageContent::text_parts(
        MessageType::HumanMessage,
        &["Write a haiku about the Rust borrow checker."],
    )];
    let options = CallOptions::default().with_streaming_func(|chunk: String| async move {
        print!("{}", chunk);
        Ok(())
    });

    let response = claude.generate_content(&messages, &options).await?;
    println!();
    if let Some(choice) = response.choices.first() {
        println!("\nstop reason: {}", choice.stop_reason);
    }
    Ok(())
}
"#;

const ANTHROPIC_LLM_README: &str = "# {{project_name}}

Streams a Claude completion to the terminal.

## Running

```sh
cp .env.example .env
cargo run
```
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let rendered = render("name = \"{{project_name}}\" use {{crate_name}};", "My-App");
        assert_eq!(rendered, "name = \"My-App\" use my_app;");
    }

    #[test]
    fn test_templates_have_core_files() {
        for template in TEMPLATES {
            let names: Vec<_> = template.files.iter().map(|(p, _)| *p).collect();
            for required in ["Cargo.toml", "src/main.rs", "README.md", ".env.example"] {
                assert!(names.contains(&required), "{} missing {}", template.name, required);
            }
        }
        assert!(find_template("rag-system")
            .unwrap()
            .files
            .iter()
            .any(|(p, _)| *p == "documents/sample.txt"));
        assert_eq!(template_names()[0], "basic-llm");
    }
}
