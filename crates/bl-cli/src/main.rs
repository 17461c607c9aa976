//! CLI frontend for the Baseline interactive fiction engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "baseline",
    about = "Baseline: play and check interactive fiction stories",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a story in the terminal
    Play {
        /// Directory containing one subdirectory per story
        #[arg(short, long, default_value = "stories")]
        stories: PathBuf,

        /// Story id to start
        story: String,

        /// Classifier to use (keyword, lexical, ollama, openai, gemini, custom); overrides AI_PROVIDER
        #[arg(short, long)]
        classifier: Option<String>,

        /// Enable the `debug` command, which dumps the current node
        #[arg(long)]
        debug: bool,
    },

    /// Validate every story in a directory
    Check {
        /// Directory containing one subdirectory per story
        #[arg(short, long, default_value = "stories")]
        stories: PathBuf,
    },

    /// List the stories in a directory
    List {
        /// Directory containing one subdirectory per story
        #[arg(short, long, default_value = "stories")]
        stories: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // stdout carries the story; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bl_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            stories,
            story,
            classifier,
            debug,
        } => commands::play::run(&stories, &story, classifier.as_deref(), debug).await,
        Commands::Check { stories } => commands::check::run(&stories),
        Commands::List { stories } => commands::list::run(&stories),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
