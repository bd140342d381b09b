//! `langchain` command line: browse and run examples, scaffold projects and
//! check provider credentials.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;

mod commands;
mod templates;

use commands::validate::Provider;

#[derive(Parser)]
#[command(name = "langchain", version, about = "LangChain Rust command line tools")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and run examples
    Examples {
        #[command(subcommand)]
        action: ExamplesAction,
    },
    /// Create a new project from a template
    Init {
        project_name: String,

        #[arg(short, long, default_value = "basic-llm")]
        template: String,

        /// Overwrite files in an existing directory
        #[arg(short, long)]
        force: bool,
    },
    /// Check API keys and provider connectivity
    Validate {
        #[arg(short, long, value_enum, default_value = "all")]
        provider: Provider,

        /// Skip the completion request
        #[arg(short, long)]
        quick: bool,
    },
}

#[derive(Subcommand)]
enum ExamplesAction {
    /// List available examples
    List {
        #[arg(short, long, env = "LANGCHAIN_EXAMPLES_DIR", default_value = "examples")]
        dir: PathBuf,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        tag: Option<String>,

        #[arg(short, long, default_value = "table", value_parser = ["table", "json"])]
        format: String,
    },
    /// Run an example by name
    Run {
        name: String,

        #[arg(short, long, env = "LANGCHAIN_EXAMPLES_DIR", default_value = "examples")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Examples { action } => match action {
            ExamplesAction::List {
                dir,
                category,
                tag,
                format,
            } => commands::examples::list(&dir, category.as_deref(), tag.as_deref(), &format),
            ExamplesAction::Run { name, dir } => commands::examples::run(&dir, &name),
        },
        Commands::Init {
            project_name,
            template,
            force,
        } => commands::init::init(&project_name, &template, force),
        Commands::Validate { provider, quick } => commands::validate::validate(provider, quick).await,
    }
}
