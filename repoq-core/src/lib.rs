//! repoq core - ask an LLM questions about a whole repository.
//!
//! This crate holds the pipeline behind the `repoq` command:
//!
//! - **Tool resolution**: find `repomix`, or fall back to `npx --yes repomix`
//! - **Caching**: one packaged snapshot per repository, keyed by path
//! - **Packaging**: run the tool and read the snapshot back from its slot
//! - **Inference**: send the snapshot and question to Gemini
//! - **Cost**: turn token usage into an estimated price
//!
//! # Example
//!
//! ```no_run
//! use repoq_core::{CacheStore, Credential, GeminiClient, Packager, RepositoryPath, ToolResolver};
//!
//! # async fn run() -> repoq_core::Result<()> {
//! let credential = Credential::from_env()?;
//! let repo = RepositoryPath::resolve(".")?;
//! let invocation = ToolResolver::new().resolve().await?;
//!
//! let store = CacheStore::default();
//! let slot = store.slot_for(&repo);
//! let packaged = match store.read(&slot)? {
//!     Some(cached) => cached,
//!     None => Packager::new(&invocation).pack(&repo, &store, &slot).await?,
//! };
//!
//! let result = GeminiClient::new(credential)
//!     .query(&packaged, "Where is the entry point?", repoq_core::DEFAULT_MODEL)
//!     .await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod constants;
pub mod cost;
pub mod error;
pub mod inference;
pub mod models;
pub mod packager;
pub mod progress;
pub mod resolver;

pub use cache::{CacheSlot, CacheStore, RepositoryPath, StagedFile};
pub use error::{RepoqError, Result};
pub use inference::{Credential, GeminiClient, QueryResult, TokenUsage};
pub use models::{DEFAULT_MODEL, SUPPORTED_MODELS};
pub use packager::{PackagedRepository, Packager};
pub use progress::ProgressIndicator;
pub use resolver::{Provenance, ToolInvocation, ToolResolver};
