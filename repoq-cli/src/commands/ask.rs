//! Ask command - answer a question about a repository.
//!
//! Pipeline:
//! 1. Check the inference credential (before any other work)
//! 2. Resolve the repository path
//! 3. Find the packaging tool
//! 4. Reuse the cached snapshot, or package the repository
//! 5. Query the model and report usage and cost

use std::path::{Path, PathBuf};

use anyhow::Context;
use repoq_core::{
    cost, CacheStore, Credential, GeminiClient, PackagedRepository, Packager, ProgressIndicator,
    RepositoryPath, ToolResolver,
};

use crate::config::RepoqConfig;
use crate::output::{self, check};

/// Options for a single question.
#[derive(Debug, Clone)]
pub struct AskOptions {
    pub question: String,
    pub repo: PathBuf,
    pub model: String,
    pub output: Option<PathBuf>,
    pub use_cache: bool,
    pub quiet: bool,
}

/// Run the ask command
pub async fn run(opts: &AskOptions, config: &RepoqConfig) -> anyhow::Result<()> {
    if opts.question.trim().is_empty() {
        anyhow::bail!("Question cannot be empty. Please provide a question about the repository.");
    }

    // Fail fast: a missing key would waste a packaging run.
    let credential = Credential::from_env()?;
    let repo = RepositoryPath::resolve(&opts.repo)?;
    let quiet = opts.quiet;

    if !quiet {
        println!("Checking for {}...", config.packaging_tool());
    }
    let invocation = ToolResolver::new()
        .with_tool(config.packaging_tool())
        .with_runner(config.package_runner())
        .with_probe_timeout(config.probe_timeout())
        .with_progress(!quiet)
        .resolve()
        .await?;
    if !quiet {
        println!("{} Found {}: {}", check(), config.packaging_tool(), invocation);
    }

    let store = CacheStore::new(config.cache_directory());
    let slot = store.slot_for(&repo);
    let use_cache = opts.use_cache && config.cache_enabled();

    let cached = if use_cache { store.read(&slot)? } else { None };
    let packaged = match cached {
        Some(packaged) => {
            if !quiet {
                let info = slot.info();
                let size = info.map(|info| info.size_bytes).unwrap_or(0);
                let age = info
                    .and_then(|info| info.modified)
                    .and_then(|modified| modified.elapsed().ok())
                    .map(output::format_age)
                    .unwrap_or_else(|| "unknown age".to_string());
                println!(
                    "{} Using cached repomix ({}, {} bytes)",
                    check(),
                    age,
                    output::format_count(size)
                );
            }
            println!("Repomix cache: {}", slot.path().display());
            packaged
        }
        None => {
            tracing::debug!("Packing {:?} (cache slot {})", repo.as_path(), slot.key());
            let indicator = ProgressIndicator::start(
                format!("Packing repository: {}", repo.as_path().display()),
                !quiet,
            );
            let packaged = Packager::new(&invocation).pack(&repo, &store, &slot).await?;
            indicator.stop(Some(
                format!(
                    "Repository packed ({} chars)",
                    output::format_count(packaged.char_count() as u64)
                )
                .as_str(),
            ));
            println!("Repomix file: {}", slot.path().display());
            packaged
        }
    };

    if !quiet {
        println!(
            "  Estimated tokens: ~{}",
            output::format_count(packaged.estimated_tokens() as u64)
        );
    }

    let client = GeminiClient::new(credential).with_base_url(config.base_url());
    let answer = query(&client, &packaged, opts).await?;
    let estimated = cost::estimate(&answer.usage, &opts.model);

    // Always printed: automation parses these lines.
    println!("{}", output::token_usage_line(&answer.usage));
    println!("{}", output::cost_line(estimated, &opts.model));

    match &opts.output {
        Some(path) => save_response(path, &answer.text, quiet)?,
        None => {
            if !quiet {
                println!("{}", output::response_banner());
            }
            println!("{}", answer.text);
        }
    }

    Ok(())
}

async fn query(
    client: &GeminiClient,
    packaged: &PackagedRepository,
    opts: &AskOptions,
) -> repoq_core::Result<repoq_core::QueryResult> {
    let indicator = ProgressIndicator::start(
        format!("Sending to {} (this may take a while for large repos)", opts.model),
        !opts.quiet,
    );
    let result = client.query(packaged, &opts.question, &opts.model).await?;
    indicator.stop(Some(format!("Response received from {}", opts.model).as_str()));
    Ok(result)
}

fn save_response(path: &Path, text: &str, quiet: bool) -> anyhow::Result<()> {
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write response to {}", path.display()))?;
    let shown = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    println!("Response saved: {}", shown.display());
    if !quiet {
        println!(
            "  Length: {} characters",
            output::format_count(text.chars().count() as u64)
        );
    }
    Ok(())
}
