//! Parallel similarity grouping of corpus tokens using word embeddings.
//!
//! The crate exposes both a library API and a `wgroup` command line interface.  A run loads
//! an [`EmbeddingTable`] once, splits the ordered token stream into contiguous chunks,
//! greedily groups each chunk by cosine similarity on a bounded worker pool, and merges the
//! per-chunk groups in chunk order so output is reproducible.
//!
//! ```no_run
//! use wordgroups::{load_embeddings, CorpusConfig, GroupingConfig, GroupingEngine};
//!
//! # fn main() -> wordgroups::Result<()> {
//! let table = load_embeddings("vectors.txt")?;
//! let cfg = GroupingConfig::builder()
//!     .threshold(0.7)
//!     .chunk_count(32)
//!     .concurrency(8)
//!     .show_progress(false)
//!     .build()?;
//! let engine = GroupingEngine::new(cfg);
//! let artifacts = engine.group_from_paths(&table, &["corpus.txt"], &CorpusConfig::default())?;
//! wordgroups::save_groups("word_groups.txt", &artifacts.report.groups, ", ")?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the library
//! only can disable default features to avoid the CLI dependencies.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod aggregate;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod grouper;
pub mod metrics;
pub mod partition;
pub mod pool;
pub mod progress;
pub mod similarity;

pub use aggregate::{merge, save_groups, write_groups, ChunkFailure, GroupingReport};
pub use config::{CorpusBuilder, CorpusConfig, GroupingBuilder, GroupingConfig};
pub use embedding::{load_embeddings, Embedding, EmbeddingTable, EmbeddingTableBuilder};
pub use engine::{GroupingArtifacts, GroupingEngine};
pub use error::{Result, WordGroupError};
pub use grouper::{group_chunk, group_chunk_with_progress, Group, GroupList};
pub use metrics::GroupingMetrics;
pub use partition::{partition, Chunk};
pub use pool::{CancellationToken, ChunkOutcome, WorkerPool};
pub use progress::ProgressTracker;
pub use similarity::cosine_similarity;
