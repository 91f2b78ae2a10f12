//! Deterministic merge of per-chunk results and group file serialization.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, WordGroupError};
use crate::grouper::{Group, GroupList};
use crate::pool::ChunkOutcome;

/// A chunk whose task did not produce groups.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Index of the failed chunk.
    pub index: usize,
    /// Reason reported by the worker pool.
    pub error: WordGroupError,
}

/// Merged output of a grouping run.
#[derive(Debug, Default)]
pub struct GroupingReport {
    /// Groups of all successful chunks, in chunk-index order then emission order.
    pub groups: Vec<Group>,
    /// Failed chunks, sorted by index.
    pub failures: Vec<ChunkFailure>,
}

impl GroupingReport {
    /// Returns `true` when every chunk succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Writes the groups to `writer`, one delimiter-joined group per line.
    pub fn write_to<W: Write>(&self, writer: W, delimiter: &str) -> std::io::Result<()> {
        write_groups(writer, &self.groups, delimiter)
    }
}

/// Sorts chunk outcomes by index and concatenates the successful group lists.
///
/// Outcomes arrive in completion order; sorting restores a reproducible order.  The sort is
/// stable, so merging an already ordered sequence leaves it unchanged.
#[must_use]
pub fn merge(mut outcomes: Vec<ChunkOutcome<GroupList>>) -> GroupingReport {
    outcomes.sort_by_key(|outcome| outcome.index);
    let mut report = GroupingReport::default();
    for outcome in outcomes {
        match outcome.result {
            Ok(groups) => report.groups.extend(groups),
            Err(error) => report.failures.push(ChunkFailure {
                index: outcome.index,
                error,
            }),
        }
    }
    report
}

/// Writes `groups` to `writer`, one line per group with members joined by `delimiter`.
pub fn write_groups<W: Write>(
    mut writer: W,
    groups: &[Group],
    delimiter: &str,
) -> std::io::Result<()> {
    for group in groups {
        let mut members = group.members().iter();
        if let Some(first) = members.next() {
            writer.write_all(first.as_bytes())?;
        }
        for member in members {
            writer.write_all(delimiter.as_bytes())?;
            writer.write_all(member.as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Writes `groups` to a file at `path`, creating parent directories as needed.
pub fn save_groups<P: AsRef<Path>>(path: P, groups: &[Group], delimiter: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| WordGroupError::io(err, Some(parent.to_path_buf())))?;
        }
    }
    let file =
        File::create(path).map_err(|err| WordGroupError::io(err, Some(path.to_path_buf())))?;
    write_groups(BufWriter::new(file), groups, delimiter)
        .map_err(|err| WordGroupError::io(err, Some(path.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn group(members: &[&str]) -> Group {
        Group::from_members(members.iter().copied()).expect("non-empty")
    }

    fn outcome(index: usize, groups: Vec<Group>) -> ChunkOutcome<GroupList> {
        ChunkOutcome {
            index,
            result: Ok(groups),
        }
    }

    #[test]
    fn merge_sorts_by_chunk_index() {
        let outcomes = vec![
            outcome(2, vec![group(&["e"])]),
            outcome(0, vec![group(&["a", "b"]), group(&["c"])]),
            outcome(1, vec![group(&["d"])]),
        ];
        let report = merge(outcomes);
        let reps: Vec<&str> = report.groups.iter().map(Group::representative).collect();
        assert_eq!(reps, vec!["a", "c", "d", "e"]);
        assert!(report.is_complete());
    }

    #[test]
    fn merge_is_idempotent_on_ordered_input() {
        let ordered = || {
            vec![
                outcome(0, vec![group(&["a"])]),
                outcome(1, vec![group(&["b", "c"])]),
            ]
        };
        let once = merge(ordered());
        let replayed: Vec<ChunkOutcome<GroupList>> = vec![outcome(0, once.groups.clone())];
        let twice = merge(replayed);
        assert_eq!(once.groups, twice.groups);
        assert_eq!(merge(ordered()).groups, once.groups);
    }

    #[test]
    fn failures_are_collected_alongside_groups() {
        let outcomes = vec![
            ChunkOutcome {
                index: 3,
                result: Err(WordGroupError::Cancelled),
            },
            outcome(1, vec![group(&["b"])]),
            ChunkOutcome {
                index: 0,
                result: Err(WordGroupError::Internal("bad".into())),
            },
        ];
        let report = merge(outcomes);
        assert_eq!(report.groups, vec![group(&["b"])]);
        let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![0, 3]);
        assert!(!report.is_complete());
    }

    #[test]
    fn writes_one_line_per_group() {
        let groups = vec![group(&["cat", "dog"]), group(&["fish"])];
        let mut buffer = Vec::new();
        write_groups(&mut buffer, &groups, ", ").expect("write");
        assert_eq!(String::from_utf8(buffer).unwrap(), "cat, dog\nfish\n");
    }

    #[test]
    fn save_groups_creates_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out").join("groups.txt");
        save_groups(&path, &[group(&["a", "b"])], "|").expect("save");
        assert_eq!(fs::read_to_string(&path).unwrap(), "a|b\n");
    }
}
