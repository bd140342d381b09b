use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct Example {
    #[tabled(rename = "NAME")]
    pub name: String,
    #[tabled(skip)]
    pub path: PathBuf,
    #[tabled(rename = "CATEGORY")]
    pub category: String,
    #[tabled(rename = "TAGS", display_with = "display_tags")]
    pub tags: Vec<String>,
    #[tabled(rename = "DESCRIPTION")]
    pub description: String,
    #[tabled(skip)]
    pub has_readme: bool,
}

impl Example {
    /// Single-file examples run through `cargo run --example`.
    pub fn is_file(&self) -> bool {
        self.path.is_file()
    }
}

fn display_tags(tags: &Vec<String>) -> String {
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.join(", ")
    }
}

const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "llm",
        &[
            "openai",
            "anthropic",
            "claude",
            "cohere",
            "groq",
            "googleai",
            "gemini",
            "ernie",
            "deepseek",
            "huggingface",
            "bedrock",
            "ollama",
            "mistral",
            "completion",
        ],
    ),
    (
        "vectorstore",
        &[
            "chroma",
            "vectorstore",
            "vector_store",
            "pinecone",
            "weaviate",
            "qdrant",
            "pgvector",
        ],
    ),
    ("chain", &["chain", "agent"]),
    ("memory", &["memory", "sqlite", "redis", "mongo"]),
    ("embedding", &["embedding"]),
    ("tool", &["tool"]),
    ("document", &["document", "qa"]),
];

const TAG_RULES: &[(&str, &str)] = &[
    ("vision", "vision"),
    ("tool", "tool-calling"),
    ("stream", "streaming"),
    ("cache", "caching"),
    ("qa", "question-answering"),
    ("chat", "chat"),
    ("completion", "completion"),
];

pub fn categorize(name: &str) -> &'static str {
    let name = name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or("other")
}

pub fn extract_tags(name: &str) -> Vec<String> {
    let name = name.to_lowercase();
    TAG_RULES
        .iter()
        .filter(|(keyword, _)| name.contains(keyword))
        .map(|(_, tag)| tag.to_string())
        .collect()
}

pub fn category_description(category: &str) -> &'static str {
    match category {
        "llm" => "Language model integration example",
        "vectorstore" => "Vector database integration example",
        "chain" => "Chain or agent workflow example",
        "memory" => "Memory management example",
        "embedding" => "Text embedding example",
        "tool" => "External tool integration example",
        "document" => "Document processing example",
        _ => "LangChain example",
    }
}

/// First substantial non-heading line of a README.
pub fn description_from_readme(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| {
            line.len() > 10 && line.len() < 200 && !line.starts_with('#') && !line.starts_with("```")
        })
        .map(str::to_string)
}

/// First non-empty `//!` line of a Rust source file.
pub fn description_from_source(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("//!"))
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

fn find_readme(dir: &Path) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case("readme.md"))
        })
}

fn main_source(dir: &Path) -> Option<PathBuf> {
    [dir.join("main.rs"), dir.join("src/main.rs")]
        .into_iter()
        .find(|p| p.is_file())
}

fn is_example_dir(dir: &Path) -> bool {
    main_source(dir).is_some() || dir.join("Cargo.toml").is_file()
}

fn build_example(name: String, path: PathBuf, source: Option<PathBuf>, readme: Option<PathBuf>) -> Example {
    let category = categorize(&name).to_string();
    let tags = extract_tags(&name);
    let description = readme
        .as_ref()
        .and_then(|p| fs::read_to_string(p).ok())
        .and_then(|c| description_from_readme(&c))
        .or_else(|| {
            source
                .and_then(|p| fs::read_to_string(p).ok())
                .and_then(|c| description_from_source(&c))
        })
        .unwrap_or_else(|| category_description(&category).to_string());
    Example {
        name,
        path,
        category,
        tags,
        description,
        has_readme: readme.is_some(),
    }
}

/// Finds cargo examples (`*.rs` directly under `root`) and example projects
/// (directories with a `main.rs`, `src/main.rs` or `Cargo.toml`).
pub fn discover(root: &Path) -> Result<Vec<Example>> {
    if !root.is_dir() {
        bail!("examples directory '{}' not found", root.display());
    }

    let mut examples = Vec::new();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && name != "target"
        });

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_file() {
            if entry.depth() == 1 && path.extension().is_some_and(|e| e == "rs") {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                examples.push(build_example(name, path.to_path_buf(), Some(path.to_path_buf()), None));
            }
            continue;
        }

        if entry.file_type().is_dir() && is_example_dir(path) {
            let name = entry.file_name().to_string_lossy().into_owned();
            examples.push(build_example(
                name,
                path.to_path_buf(),
                main_source(path),
                find_readme(path),
            ));
            walker.skip_current_dir();
        }
    }

    examples.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!("discovered {} examples under {}", examples.len(), root.display());
    Ok(examples)
}

pub fn filter(examples: Vec<Example>, category: Option<&str>, tag: Option<&str>) -> Vec<Example> {
    let tag = tag.map(str::to_lowercase);
    examples
        .into_iter()
        .filter(|e| category.map_or(true, |c| e.category.eq_ignore_ascii_case(c)))
        .filter(|e| {
            tag.as_deref()
                .map_or(true, |t| e.tags.iter().any(|et| et.to_lowercase().contains(t)))
        })
        .collect()
}

pub fn render_table(examples: &[Example]) -> String {
    Table::new(examples).with(Style::psql()).to_string()
}

pub fn list(dir: &Path, category: Option<&str>, tag: Option<&str>, format: &str) -> Result<()> {
    let examples = discover(dir).context("failed to discover examples")?;
    let examples = filter(examples, category, tag);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&examples)?),
        "table" => {
            if examples.is_empty() {
                println!("No examples found.");
            } else {
                println!("{}", render_table(&examples));
            }
        }
        other => bail!("unsupported format '{}'. Use table or json", other),
    }
    Ok(())
}

pub fn run(dir: &Path, name: &str) -> Result<()> {
    let examples = discover(dir).context("failed to discover examples")?;
    let Some(example) = examples.into_iter().find(|e| e.name == name) else {
        bail!(
            "example '{}' not found. Use 'langchain examples list' to see available examples",
            name
        );
    };

    println!("Running example: {}", example.name);
    println!("Description: {}", example.description);
    println!("Path: {}\n", example.path.display());

    let mut command = Command::new("cargo");
    if example.is_file() {
        command.args(["run", "--example", &example.name]);
    } else {
        let manifest = example.path.join("Cargo.toml");
        if !manifest.is_file() {
            bail!("example '{}' has no Cargo.toml to run", example.name);
        }
        command.arg("run").arg("--manifest-path").arg(manifest);
    }

    log::debug!("executing {:?}", command);
    let status = command.status().context("failed to start cargo")?;
    if !status.success() {
        bail!("example '{}' exited with {}", example.name, status);
    }
    Ok(())
}
