//! Configuration builders controlling grouping runs and token ingestion.

use crate::error::{Result, WordGroupError};
use serde::{Deserialize, Serialize};

/// Default cosine similarity threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.7;
/// Default number of chunks the token stream is split into.
pub const DEFAULT_CHUNK_COUNT: usize = 32;
/// Default number of chunks processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 32;
/// Default delimiter placed between group members in the output file.
pub const DEFAULT_DELIMITER: &str = ", ";

/// Configuration for a similarity grouping run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupingConfig {
    /// Tokens join a group only when their cosine similarity strictly exceeds this value.
    pub threshold: f32,
    /// Number of contiguous chunks the token stream is partitioned into.
    pub chunk_count: usize,
    /// Upper bound on chunks processed at the same time.
    pub concurrency: usize,
    /// Separator written between members of a group.
    pub delimiter: String,
    /// Enables per-run logging through the `log` facade.
    pub show_progress: bool,
}

impl GroupingConfig {
    /// Returns a builder initialised with [`GroupingConfig::default`].
    #[must_use]
    pub fn builder() -> GroupingBuilder {
        GroupingBuilder::default()
    }

    /// Validates the invariants required for grouping.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(WordGroupError::InvalidConfig(format!(
                "threshold ({}) must be a finite number",
                self.threshold
            )));
        }
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(WordGroupError::InvalidConfig(format!(
                "threshold ({}) must lie within [-1, 1]",
                self.threshold
            )));
        }
        if self.chunk_count == 0 {
            return Err(WordGroupError::InvalidConfig(
                "chunk_count must be greater than zero".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(WordGroupError::InvalidConfig(
                "concurrency must be greater than zero".into(),
            ));
        }
        if self.delimiter.is_empty() {
            return Err(WordGroupError::InvalidConfig(
                "delimiter must not be empty".into(),
            ));
        }
        if self.delimiter.contains(['\n', '\r']) {
            return Err(WordGroupError::InvalidConfig(
                "delimiter must not contain line breaks".into(),
            ));
        }
        Ok(())
    }

    /// Number of workers actually needed for `chunks` chunks.
    #[must_use]
    pub fn effective_concurrency(&self, chunks: usize) -> usize {
        self.concurrency.min(chunks).max(1)
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            chunk_count: DEFAULT_CHUNK_COUNT,
            concurrency: DEFAULT_CONCURRENCY,
            delimiter: DEFAULT_DELIMITER.into(),
            show_progress: true,
        }
    }
}

/// Builder for [`GroupingConfig`].
#[derive(Debug, Default, Clone)]
pub struct GroupingBuilder {
    cfg: GroupingConfig,
}

impl GroupingBuilder {
    /// Creates a builder with [`GroupingConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the similarity threshold.
    #[must_use]
    pub fn threshold(mut self, value: f32) -> Self {
        self.cfg.threshold = value;
        self
    }

    /// Sets the number of chunks.
    #[must_use]
    pub fn chunk_count(mut self, value: usize) -> Self {
        self.cfg.chunk_count = value;
        self
    }

    /// Sets the worker concurrency limit.
    #[must_use]
    pub fn concurrency(mut self, value: usize) -> Self {
        self.cfg.concurrency = value;
        self
    }

    /// Sets the output delimiter.
    #[must_use]
    pub fn delimiter<S: Into<String>>(mut self, value: S) -> Self {
        self.cfg.delimiter = value.into();
        self
    }

    /// Enables or disables per-run logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`GroupingConfig`].
    pub fn build(self) -> Result<GroupingConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how token files are read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
    /// Lower-cases every token after splitting.
    pub lowercase: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            lowercase: true,
        }
    }
}

impl CorpusConfig {
    /// Returns a builder initialised with [`CorpusConfig::default`].
    #[must_use]
    pub fn builder() -> CorpusBuilder {
        CorpusBuilder::default()
    }
}

/// Builder for [`CorpusConfig`].
#[derive(Debug, Default, Clone)]
pub struct CorpusBuilder {
    cfg: CorpusConfig,
}

impl CorpusBuilder {
    /// Creates a new builder with [`CorpusConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Enables or disables lower-casing of tokens.
    #[must_use]
    pub fn lowercase(mut self, enabled: bool) -> Self {
        self.cfg.lowercase = enabled;
        self
    }

    /// Finalises the builder, returning the [`CorpusConfig`].
    pub fn build(self) -> CorpusConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_overrides() {
        let cfg = GroupingConfig::builder()
            .threshold(0.5)
            .chunk_count(4)
            .concurrency(2)
            .delimiter("|")
            .show_progress(false)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.threshold, 0.5);
        assert_eq!(cfg.chunk_count, 4);
        assert_eq!(cfg.concurrency, 2);
        assert_eq!(cfg.delimiter, "|");
        assert!(!cfg.show_progress);
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GroupingConfig::default();
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.chunk_count, 32);
        assert_eq!(cfg.concurrency, 32);
        assert_eq!(cfg.delimiter, ", ");
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn validate_rejects_zero_chunks() {
        let cfg = GroupingConfig {
            chunk_count: 0,
            ..GroupingConfig::default()
        };
        let err = cfg.validate().expect_err("validation should fail");
        assert!(matches!(
            err,
            WordGroupError::InvalidConfig(message) if message.contains("chunk_count")
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        for threshold in [f32::NAN, 1.5, -2.0] {
            let err = GroupingConfig::builder()
                .threshold(threshold)
                .build()
                .expect_err("threshold should be rejected");
            assert!(matches!(err, WordGroupError::InvalidConfig(_)));
        }
    }

    #[test]
    fn validate_rejects_newline_delimiter() {
        let err = GroupingConfig::builder()
            .delimiter("\n")
            .build()
            .expect_err("delimiter should be rejected");
        assert!(matches!(
            err,
            WordGroupError::InvalidConfig(message) if message.contains("line breaks")
        ));
    }

    #[test]
    fn effective_concurrency_is_capped_by_chunks() {
        let cfg = GroupingConfig::default();
        assert_eq!(cfg.effective_concurrency(3), 3);
        assert_eq!(cfg.effective_concurrency(100), 32);
        assert_eq!(cfg.effective_concurrency(0), 1);
    }

    #[test]
    fn corpus_builder_overrides_defaults() {
        let cfg = CorpusConfig::builder()
            .recursive(false)
            .follow_symlinks(true)
            .lowercase(false)
            .build();
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
        assert!(!cfg.lowercase);
    }
}
