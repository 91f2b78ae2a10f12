//! Word embedding tables and the text loader that builds them.
//!
//! Tables are built through [`EmbeddingTableBuilder`], which owns the map exclusively, and
//! then frozen into an [`EmbeddingTable`] that only exposes shared reads.  The frozen table
//! is `Sync`, so workers borrow it directly without any locking.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::error::{Result, WordGroupError};
use crate::similarity::magnitude;

/// A word vector together with its precomputed Euclidean norm.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    vector: Box<[f32]>,
    norm: f32,
}

impl Embedding {
    /// Wraps `vector`, computing its norm once.
    #[must_use]
    pub fn new(vector: Vec<f32>) -> Self {
        let norm = magnitude(&vector);
        Self {
            vector: vector.into_boxed_slice(),
            norm,
        }
    }

    /// Returns the vector components.
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Returns the Euclidean norm of the vector.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.norm
    }

    /// Returns `true` when the vector has zero magnitude.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.norm == 0.0
    }

    /// Cosine similarity with `other`; zero when either side is a zero vector.
    #[must_use]
    pub fn cosine(&self, other: &Embedding) -> f32 {
        crate::similarity::cosine_with_norms(&self.vector, self.norm, &other.vector, other.norm)
    }
}

/// Mutable loading phase of an embedding table.
#[derive(Debug, Default)]
pub struct EmbeddingTableBuilder {
    entries: FxHashMap<String, Embedding>,
    dimension: Option<usize>,
    duplicates: usize,
}

impl EmbeddingTableBuilder {
    /// Creates an empty builder whose dimension is fixed by the first insert.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder that only accepts vectors of `dimension` components.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    /// Dimension fixed so far, if any vector has been inserted or declared.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Number of words inserted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no word has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `word`, replacing any earlier vector for the same word.
    pub fn insert<S: Into<String>>(&mut self, word: S, vector: Vec<f32>) -> Result<()> {
        self.insert_at(word.into(), vector, None)
    }

    fn insert_at(&mut self, word: String, vector: Vec<f32>, line: Option<usize>) -> Result<()> {
        if vector.is_empty() {
            return Err(WordGroupError::DimensionMismatch {
                expected: self.dimension.unwrap_or(0),
                found: 0,
                line,
            });
        }
        let expected = *self.dimension.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(WordGroupError::DimensionMismatch {
                expected,
                found: vector.len(),
                line,
            });
        }
        if self.entries.insert(word, Embedding::new(vector)).is_some() {
            self.duplicates += 1;
        }
        Ok(())
    }

    /// Ends the loading phase.
    #[must_use]
    pub fn freeze(self) -> EmbeddingTable {
        EmbeddingTable {
            entries: self.entries,
            dimension: self.dimension.unwrap_or(0),
            duplicates: self.duplicates,
        }
    }
}

/// Immutable word → vector table shared by all grouping workers.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingTable {
    entries: FxHashMap<String, Embedding>,
    dimension: usize,
    duplicates: usize,
}

impl EmbeddingTable {
    /// Returns a builder for a new table.
    #[must_use]
    pub fn builder() -> EmbeddingTableBuilder {
        EmbeddingTableBuilder::new()
    }

    /// Looks up the embedding of `word`.
    #[must_use]
    pub fn lookup(&self, word: &str) -> Option<&Embedding> {
        self.entries.get(word)
    }

    /// Returns `true` if `word` has an embedding.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// Number of words in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimension shared by every entry (0 for an empty table).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of words that were inserted more than once while loading.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Number of zero-magnitude vectors.
    #[must_use]
    pub fn zero_vectors(&self) -> usize {
        self.entries.values().filter(|e| e.is_zero()).count()
    }

    /// Iterates over the words of the table in arbitrary order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Parses a whitespace-separated text table from `reader`.
    ///
    /// Each line holds a word followed by its components.  Blank and single-field lines are
    /// skipped, and a leading `<count> <dimension>` header is recognised and skipped.  Any
    /// malformed component, non-finite value, invalid UTF-8 line or dimension disagreement
    /// aborts the whole load.
    pub fn from_reader<R: BufRead>(mut reader: R, source_name: &str) -> Result<Self> {
        let mut builder = EmbeddingTableBuilder::new();
        let mut raw = Vec::new();
        let mut line_no = 0usize;
        let mut seen_record = false;
        let mut skipped = 0usize;

        loop {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .map_err(|err| WordGroupError::io(err, None))?;
            if read == 0 {
                break;
            }
            line_no += 1;
            let line = std::str::from_utf8(&raw).map_err(|err| WordGroupError::Parse {
                source_name: source_name.to_string(),
                line: line_no,
                message: format!("invalid UTF-8: {err}"),
            })?;

            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let components: Vec<&str> = fields.collect();
            if components.is_empty() {
                skipped += 1;
                continue;
            }

            if !seen_record {
                seen_record = true;
                if let Some(dimension) = parse_header(word, &components) {
                    debug!("{source_name}: header declares dimension {dimension}");
                    builder = EmbeddingTableBuilder::with_dimension(dimension);
                    continue;
                }
            }

            let mut vector = Vec::with_capacity(components.len());
            for (idx, field) in components.iter().enumerate() {
                let value = field.parse::<f32>().map_err(|err| WordGroupError::Parse {
                    source_name: source_name.to_string(),
                    line: line_no,
                    message: format!("component {} of `{word}` (`{field}`): {err}", idx + 1),
                })?;
                if !value.is_finite() {
                    return Err(WordGroupError::Parse {
                        source_name: source_name.to_string(),
                        line: line_no,
                        message: format!(
                            "component {} of `{word}` (`{field}`) is not a finite f32",
                            idx + 1
                        ),
                    });
                }
                vector.push(value);
            }
            builder.insert_at(word.to_string(), vector, Some(line_no))?;
        }

        if builder.is_empty() {
            return Err(WordGroupError::InvalidConfig(format!(
                "no embeddings could be loaded from {source_name}"
            )));
        }
        if skipped > 0 {
            debug!("{source_name}: skipped {skipped} lines without vector components");
        }
        let table = builder.freeze();
        if table.duplicates > 0 {
            warn!(
                "{source_name}: {} words appeared more than once; later vectors were kept",
                table.duplicates
            );
        }
        info!(
            "loaded {} embeddings of dimension {} from {source_name}",
            table.len(),
            table.dimension
        );
        Ok(table)
    }
}

/// Loads an embedding table from a text file on disk.
pub fn load_embeddings<P: AsRef<Path>>(path: P) -> Result<EmbeddingTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| WordGroupError::io(err, Some(path.to_path_buf())))?;
    EmbeddingTable::from_reader(BufReader::new(file), &path.display().to_string()).map_err(
        |err| match err {
            WordGroupError::Io { source, path: None } => {
                WordGroupError::io(source, Some(path.to_path_buf()))
            }
            other => other,
        },
    )
}

fn parse_header(first: &str, rest: &[&str]) -> Option<usize> {
    if rest.len() != 1 {
        return None;
    }
    first.parse::<usize>().ok()?;
    rest[0].parse::<usize>().ok().filter(|&dim| dim > 0)
}
