//! High-level grouping run: partition, dispatch to the worker pool, merge.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::aggregate::{merge, GroupingReport};
use crate::config::{CorpusConfig, GroupingBuilder, GroupingConfig};
use crate::corpus::load_tokens;
use crate::embedding::EmbeddingTable;
use crate::error::{Result, WordGroupError};
use crate::grouper::group_chunk_with_progress;
use crate::metrics::{sample_rss_kb, GroupingMetrics};
use crate::partition::{partition, Chunk};
use crate::pool::{CancellationToken, WorkerPool};
use crate::progress::ProgressTracker;

/// Façade configuring and executing similarity grouping runs.
#[derive(Debug, Clone)]
pub struct GroupingEngine {
    cfg: GroupingConfig,
}

/// Artifacts returned after a grouping run completes.
#[must_use]
#[derive(Debug)]
pub struct GroupingArtifacts {
    /// Merged groups and per-chunk failures.
    pub report: GroupingReport,
    /// Statistics captured during the run.
    pub metrics: GroupingMetrics,
}

impl GroupingEngine {
    /// Creates a new engine for the supplied configuration.
    #[must_use]
    pub fn new(cfg: GroupingConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`GroupingBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> GroupingBuilder {
        GroupingConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &GroupingConfig {
        &self.cfg
    }

    /// Reads token files according to [`CorpusConfig`] and groups them.
    pub fn group_from_paths<P: AsRef<Path>>(
        &self,
        table: &EmbeddingTable,
        inputs: &[P],
        corpus: &CorpusConfig,
    ) -> Result<GroupingArtifacts> {
        let tokens = load_tokens(inputs, corpus)?;
        self.group_tokens(table, &tokens)
    }

    /// Groups an in-memory token stream.
    pub fn group_tokens<S>(
        &self,
        table: &EmbeddingTable,
        tokens: &[S],
    ) -> Result<GroupingArtifacts>
    where
        S: AsRef<str> + Sync,
    {
        self.group_tokens_with(
            table,
            tokens,
            &ProgressTracker::new(),
            &CancellationToken::new(),
        )
    }

    /// Groups an in-memory token stream, reporting progress and honouring cancellation.
    ///
    /// Configuration errors and pool construction failures abort the run.  Failures of
    /// individual chunks are returned in [`GroupingReport::failures`] next to the groups of
    /// the chunks that succeeded.
    pub fn group_tokens_with<S>(
        &self,
        table: &EmbeddingTable,
        tokens: &[S],
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<GroupingArtifacts>
    where
        S: AsRef<str> + Sync,
    {
        self.cfg.validate()?;
        let start = Instant::now();
        let chunks = partition(tokens.len(), self.cfg.chunk_count);
        let concurrency = self.cfg.effective_concurrency(chunks.len());

        let mut metrics = GroupingMetrics {
            tokens: tokens.len(),
            chunks: chunks.len(),
            concurrency,
            threshold: self.cfg.threshold,
            ..GroupingMetrics::default()
        };

        if chunks.is_empty() {
            debug!("no tokens to group");
            metrics.total_duration = start.elapsed();
            return Ok(GroupingArtifacts {
                report: GroupingReport::default(),
                metrics,
            });
        }

        if self.cfg.show_progress {
            info!(
                "grouping {} tokens in {} chunks with {} workers (threshold {})",
                tokens.len(),
                chunks.len(),
                concurrency,
                self.cfg.threshold
            );
        }

        let pool = WorkerPool::new(concurrency)?;
        let threshold = self.cfg.threshold;
        let outcomes = pool.run_all(
            &chunks,
            |chunk| {
                let slice = chunk_tokens(chunk, tokens)?;
                let groups = group_chunk_with_progress(slice, table, threshold, progress);
                debug!(
                    "chunk {:>4}: tokens={} groups={}",
                    chunk.index,
                    chunk.len(),
                    groups.len()
                );
                Ok(groups)
            },
            cancel,
        );
        let report = merge(outcomes);

        for failure in &report.failures {
            warn!("chunk {} failed: {}", failure.index, failure.error);
        }

        metrics.oov_tokens = pool.install(|| {
            tokens
                .par_iter()
                .filter(|token| !table.contains((*token).as_ref()))
                .count()
        });
        metrics.record_report(&report);
        metrics.total_duration = start.elapsed();
        metrics.rss_kb = sample_rss_kb();

        if self.cfg.show_progress {
            info!(
                "formed {} groups from {} tokens in {:.2?} ({} out of vocabulary, {} chunks failed)",
                metrics.groups,
                metrics.tokens,
                metrics.total_duration,
                metrics.oov_tokens,
                metrics.failed_chunks
            );
        }

        Ok(GroupingArtifacts { report, metrics })
    }
}

fn chunk_tokens<'a, S>(chunk: &Chunk, tokens: &'a [S]) -> Result<&'a [S]> {
    chunk.slice(tokens).ok_or_else(|| {
        WordGroupError::Internal(format!(
            "chunk {} spans [{}, {}) beyond {} tokens",
            chunk.index,
            chunk.start,
            chunk.end,
            tokens.len()
        ))
    })
}

impl fmt::Display for GroupingArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} groups from {} tokens",
            self.metrics.groups, self.metrics.tokens
        )?;
        writeln!(
            f,
            "Chunks: {} ({} failed)",
            self.metrics.chunks, self.metrics.failed_chunks
        )?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingTableBuilder;
    use crate::grouper::Group;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn engine(chunks: usize, concurrency: usize) -> GroupingEngine {
        let cfg = GroupingConfig::builder()
            .chunk_count(chunks)
            .concurrency(concurrency)
            .show_progress(false)
            .build()
            .unwrap();
        GroupingEngine::new(cfg)
    }

    fn animals() -> EmbeddingTable {
        let mut builder = EmbeddingTableBuilder::new();
        builder.insert("cat", vec![1.0, 0.0]).unwrap();
        builder.insert("dog", vec![0.99, 0.14]).unwrap();
        builder.insert("fish", vec![0.0, 1.0]).unwrap();
        builder.freeze()
    }

    fn lines(groups: &[Group]) -> Vec<String> {
        groups.iter().map(|g| g.join(", ")).collect()
    }

    #[test]
    fn single_chunk_matches_grouper() {
        let artefacts = engine(1, 1)
            .group_tokens(&animals(), &["cat", "dog", "fish"])
            .unwrap();
        assert_eq!(lines(&artefacts.report.groups), vec!["cat, dog", "fish"]);
        assert!(artefacts.report.is_complete());
        assert_eq!(artefacts.metrics.groups, 2);
    }

    #[test]
    fn chunk_boundaries_split_similar_words() {
        // Two chunks: [cat, fish] and [dog, zebra]; cat and dog are never compared.
        let artefacts = engine(2, 2)
            .group_tokens(&animals(), &["cat", "fish", "dog", "zebra"])
            .unwrap();
        assert_eq!(lines(&artefacts.report.groups), vec!["cat", "fish", "dog"]);
        assert_eq!(artefacts.metrics.oov_tokens, 1);
        assert_eq!(artefacts.metrics.chunks, 2);
    }

    #[test]
    fn words_may_repeat_across_chunks() {
        let artefacts = engine(2, 2)
            .group_tokens(&animals(), &["cat", "dog", "cat", "dog"])
            .unwrap();
        assert_eq!(lines(&artefacts.report.groups), vec!["cat, dog", "cat, dog"]);
    }

    #[test]
    fn empty_stream_yields_empty_report() {
        let tokens: Vec<String> = Vec::new();
        let artefacts = engine(4, 4).group_tokens(&animals(), &tokens).unwrap();
        assert!(artefacts.report.groups.is_empty());
        assert_eq!(artefacts.metrics.chunks, 0);
    }

    #[test]
    fn progress_counts_every_token() {
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);
        let progress = ProgressTracker::with_observer(move |n| {
            sink.fetch_add(n, Ordering::Relaxed);
        });
        let tokens = ["cat", "dog", "fish", "cat", "bird", "fish", "dog"];
        engine(3, 2)
            .group_tokens_with(&animals(), &tokens, &progress, &CancellationToken::new())
            .unwrap();
        assert_eq!(progress.processed(), tokens.len() as u64);
        assert_eq!(seen.load(Ordering::Relaxed), tokens.len() as u64);
    }

    #[test]
    fn cancellation_reports_every_chunk() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let artefacts = engine(3, 3)
            .group_tokens_with(
                &animals(),
                &["cat", "dog", "fish"],
                &ProgressTracker::new(),
                &cancel,
            )
            .unwrap();
        assert!(artefacts.report.groups.is_empty());
        assert_eq!(artefacts.metrics.failed_chunks, 3);
        assert!(artefacts
            .report
            .failures
            .iter()
            .all(|f| matches!(f.error, WordGroupError::Cancelled)));
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let cfg = GroupingConfig {
            concurrency: 0,
            ..GroupingConfig::default()
        };
        let err = GroupingEngine::new(cfg)
            .group_tokens(&animals(), &["cat"])
            .expect_err("invalid config");
        assert!(matches!(err, WordGroupError::InvalidConfig(_)));
    }

    #[test]
    fn group_from_paths_reads_token_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.txt");
        fs::write(&path, "Cat DOG fish").unwrap();
        let artefacts = engine(1, 1)
            .group_from_paths(&animals(), &[path], &CorpusConfig::default())
            .unwrap();
        assert_eq!(lines(&artefacts.report.groups), vec!["cat, dog", "fish"]);
        assert!(artefacts.to_string().contains("2 groups from 3 tokens"));
    }
}
