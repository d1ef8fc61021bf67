//! repoq CLI - ask an LLM questions about a whole repository.
//!
//! Packs a repository with repomix, caches the snapshot, and sends it along
//! with the question to a Gemini model.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::PossibleValuesParser;
use clap::Parser;
use colored::Colorize;
use repoq_core::error::{EXIT_FAILURE, EXIT_INTERRUPTED};
use repoq_core::{RepoqError, SUPPORTED_MODELS};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{ask, models};
use config::RepoqConfig;

/// Ask questions about a repository using Gemini.
///
/// The repository is packed into a single text file with repomix. The
/// packed file is cached per repository, so follow-up questions skip the
/// packing step.
#[derive(Parser, Debug)]
#[command(name = "repoq")]
#[command(author, version)]
#[command(about = "Ask questions about a repository using Gemini")]
#[command(after_help = "Examples:
  repoq \"What does this project do?\"
  repoq -r ../service -m gemini-2.5-pro \"Where is auth handled?\"
  repoq --no-cache -o answer.md \"Summarize the architecture\"

Requires the GEMINI_API_KEY environment variable.")]
pub struct Cli {
    /// Question to ask about the repository
    #[arg(required_unless_present = "list_models")]
    question: Option<String>,

    /// Repository to analyze (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Model to use (defaults to the configured model, or gemini-2.5-flash)
    #[arg(short, long, value_parser = PossibleValuesParser::new(SUPPORTED_MODELS.iter().copied()))]
    model: Option<String>,

    /// List supported models and exit
    #[arg(long)]
    list_models: bool,

    /// Write the response to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Repack the repository even if a cached snapshot exists
    #[arg(long)]
    no_cache: bool,

    /// Suppress progress output (usage, cost and the answer are still printed)
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_models {
        models::run();
        return ExitCode::SUCCESS;
    }

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .repoqrc.toml
    let config = RepoqConfig::load(std::path::Path::new("."));

    // Apply color override from config if set
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let opts = ask::AskOptions {
        question: cli.question.unwrap_or_default(),
        repo: cli.repo,
        model: cli
            .model
            .unwrap_or_else(|| config.default_model().to_string()),
        output: cli.output,
        use_cache: !cli.no_cache,
        quiet: cli.quiet,
    };
    tracing::debug!("{:?}", opts);

    // Dropping the pipeline future stops the spinner and kills any child.
    let result = tokio::select! {
        res = ask::run(&opts, &config) => res,
        _ = tokio::signal::ctrl_c() => Err(RepoqError::Interrupted.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(report(&err)),
    }
}

/// Print a failure to stderr and return the process exit code for it.
fn report(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RepoqError>() {
        Some(RepoqError::Interrupted) => {
            eprintln!("\n\n{}", RepoqError::Interrupted);
            EXIT_INTERRUPTED
        }
        Some(repoq_err) => {
            eprintln!("{} {}", "Error:".red().bold(), repoq_err);
            repoq_err.exit_code()
        }
        None => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            EXIT_FAILURE
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug,reqwest=info,hyper=info"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}
