//! TaskForge CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Initialize config & reports directory
//! - `run`     — Refine a task through the search/think/evaluate loop

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "taskforge",
    about = "TaskForge — iterative task refinement with LLM self-evaluation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the reports directory
    Onboard,

    /// Run the refinement loop on a task
    Run {
        /// The task description (all remaining words)
        #[arg(trailing_var_arg = true)]
        task: Vec<String>,

        /// Seed context for the task; skips the interactive questions and
        /// runs headless with a JSON summary on stdout
        #[arg(short, long)]
        context: Option<String>,

        /// Where to write the report (defaults to ~/.taskforge/reports)
        #[arg(long)]
        reports_dir: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run {
            task,
            context,
            reports_dir,
        } => commands::run::run(task, context, reports_dir).await?,
    }

    Ok(())
}
