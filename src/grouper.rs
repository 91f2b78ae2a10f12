//! Greedy single-pass similarity grouping inside one chunk.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::embedding::{Embedding, EmbeddingTable};
use crate::progress::ProgressTracker;

const PROGRESS_BATCH: u64 = 1024;

/// Tokens judged similar to the group's representative (its first member).
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
pub struct Group {
    members: Vec<String>,
}

/// Groups produced by one chunk, in emission order.
pub type GroupList = Vec<Group>;

impl Group {
    fn seed(representative: &str) -> Self {
        Self {
            members: vec![representative.to_string()],
        }
    }

    /// Builds a group from explicit members; the first member is the representative.
    ///
    /// Returns `None` for an empty member list.
    #[must_use]
    pub fn from_members<I, S>(members: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        (!members.is_empty()).then_some(Self { members })
    }

    /// The token that seeded the group.
    #[must_use]
    pub fn representative(&self) -> &str {
        self.members.first().map_or("", String::as_str)
    }

    /// All members, representative first.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Number of members including the representative.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`; a group holds at least its representative.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` when only the representative is present.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// Joins the members with `delimiter`.
    #[must_use]
    pub fn join(&self, delimiter: &str) -> String {
        self.members.join(delimiter)
    }
}

/// Clusters `tokens` by cosine similarity.
///
/// Tokens are visited in order.  Each token not yet assigned and present in `table` seeds a
/// new group, then the whole chunk is scanned for unassigned, known tokens whose similarity
/// to the seed strictly exceeds `threshold`; those join the group.  Candidates are only
/// compared with the seed, never with other members, so the result depends on token order.
/// Unknown tokens are dropped silently and every known word lands in exactly one group.
/// Zero vectors always form singleton groups.
#[must_use]
pub fn group_chunk<S: AsRef<str>>(
    tokens: &[S],
    table: &EmbeddingTable,
    threshold: f32,
) -> GroupList {
    group_chunk_with_progress(tokens, table, threshold, &ProgressTracker::new())
}

/// Same as [`group_chunk`], reporting scanned seed positions to `progress`.
///
/// Increments are batched; once the call returns exactly `tokens.len()` has been added.
pub fn group_chunk_with_progress<S: AsRef<str>>(
    tokens: &[S],
    table: &EmbeddingTable,
    threshold: f32,
    progress: &ProgressTracker,
) -> GroupList {
    // Resolve lookups once; the scan below touches every pair.
    let resolved: Vec<(&str, Option<&Embedding>)> = tokens
        .iter()
        .map(|token| {
            let word = token.as_ref();
            (word, table.lookup(word))
        })
        .collect();

    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut groups = GroupList::new();
    let mut pending = 0u64;

    for &(seed, seed_vec) in &resolved {
        pending += 1;
        if pending == PROGRESS_BATCH {
            progress.add(pending);
            pending = 0;
        }
        if visited.contains(seed) {
            continue;
        }
        let Some(seed_vec) = seed_vec else {
            continue;
        };

        let mut group = Group::seed(seed);
        visited.insert(seed);
        // A zero vector has no direction and stays alone whatever the threshold.
        if seed_vec.is_zero() {
            groups.push(group);
            continue;
        }

        for &(candidate, candidate_vec) in &resolved {
            if candidate == seed || visited.contains(candidate) {
                continue;
            }
            let Some(candidate_vec) = candidate_vec else {
                continue;
            };
            if candidate_vec.is_zero() {
                continue;
            }
            if seed_vec.cosine(candidate_vec) > threshold {
                group.members.push(candidate.to_string());
                visited.insert(candidate);
            }
        }

        groups.push(group);
    }

    progress.add(pending);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingTableBuilder;

    fn table(entries: &[(&str, &[f32])]) -> EmbeddingTable {
        let mut builder = EmbeddingTableBuilder::new();
        for (word, vector) in entries {
            builder.insert(*word, vector.to_vec()).expect("insert");
        }
        builder.freeze()
    }

    fn members(groups: &[Group]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.members().iter().map(String::as_str).collect())
            .collect()
    }

    fn animals() -> EmbeddingTable {
        table(&[
            ("cat", &[1.0, 0.0]),
            ("dog", &[0.99, 0.14]),
            ("fish", &[0.0, 1.0]),
        ])
    }

    #[test]
    fn similar_words_share_a_group() {
        let groups = group_chunk(&["cat", "dog", "fish"], &animals(), 0.7);
        assert_eq!(members(&groups), vec![vec!["cat", "dog"], vec!["fish"]]);
        assert_eq!(groups[0].representative(), "cat");
        assert!(groups[1].is_singleton());
    }

    #[test]
    fn unknown_words_are_dropped() {
        let groups = group_chunk(&["cat", "unknownword", "dog"], &animals(), 0.7);
        assert_eq!(members(&groups), vec![vec!["cat", "dog"]]);
    }

    #[test]
    fn earlier_unvisited_tokens_are_candidates() {
        // "fish" comes first but is dissimilar to "cat"; "dog" is found behind "cat".
        let groups = group_chunk(&["fish", "dog", "cat"], &animals(), 0.7);
        assert_eq!(members(&groups), vec![vec!["fish"], vec!["dog", "cat"]]);
    }

    #[test]
    fn threshold_is_strict() {
        let t = table(&[("a", &[1.0, 0.0]), ("b", &[1.0, 0.0])]);
        let groups = group_chunk(&["a", "b"], &t, 1.0);
        assert_eq!(members(&groups), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn grouping_is_not_transitive() {
        // a~b and b~c, but a and c are far apart: c is compared only with a.
        let t = table(&[
            ("a", &[1.0, 0.0]),
            ("b", &[0.7071, 0.7071]),
            ("c", &[0.0, 1.0]),
        ]);
        let groups = group_chunk(&["a", "b", "c"], &t, 0.6);
        assert_eq!(members(&groups), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn zero_vectors_neither_join_nor_attract() {
        let t = table(&[
            ("zero", &[0.0, 0.0]),
            ("cat", &[1.0, 0.0]),
            ("kitten", &[1.0, 0.01]),
        ]);
        let groups = group_chunk(&["zero", "cat", "kitten"], &t, 0.0);
        assert_eq!(members(&groups), vec![vec!["zero"], vec!["cat", "kitten"]]);
    }

    #[test]
    fn zero_vectors_stay_alone_at_negative_thresholds() {
        let t = table(&[
            ("zero", &[0.0, 0.0]),
            ("cat", &[1.0, 0.0]),
            ("fish", &[0.0, 1.0]),
        ]);
        let groups = group_chunk(&["zero", "cat", "fish"], &t, -0.5);
        assert_eq!(members(&groups), vec![vec!["zero"], vec!["cat", "fish"]]);

        let groups = group_chunk(&["cat", "zero", "fish"], &t, -1.0);
        assert_eq!(members(&groups), vec![vec!["cat", "fish"], vec!["zero"]]);
    }

    #[test]
    fn repeated_words_are_grouped_once() {
        let groups = group_chunk(&["cat", "dog", "cat", "dog"], &animals(), 0.7);
        assert_eq!(members(&groups), vec![vec!["cat", "dog"]]);
    }

    #[test]
    fn every_known_word_appears_exactly_once() {
        let tokens = ["cat", "fish", "bird", "dog", "fish", "cat", "zzz"];
        let groups = group_chunk(&tokens, &animals(), 0.2);
        let mut seen: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.members().iter().map(String::as_str))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!["cat", "dog", "fish"]);
    }

    #[test]
    fn output_is_deterministic() {
        let tokens: Vec<String> = ["dog", "fish", "cat", "fish", "dog"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let first = group_chunk(&tokens, &animals(), 0.5);
        let second = group_chunk(&tokens, &animals(), 0.5);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_chunk_yields_no_groups() {
        let tokens: [&str; 0] = [];
        assert!(group_chunk(&tokens, &animals(), 0.7).is_empty());
    }

    #[test]
    fn from_members_rejects_empty() {
        assert!(Group::from_members(Vec::<String>::new()).is_none());
        let group = Group::from_members(["a", "b"]).expect("group");
        assert_eq!(group.join(", "), "a, b");
        assert_eq!(group.representative(), "a");
        assert!(!group.is_empty());
    }

    #[test]
    fn serialized_group_lists_members() {
        let group = Group::from_members(["cat", "dog"]).expect("group");
        let json = serde_json::to_string(&group).expect("serialize");
        assert_eq!(json, r#"{"members":["cat","dog"]}"#);
    }

    #[test]
    fn progress_variant_reports_every_token() {
        let table = table(&[("a", &[1.0, 0.0]), ("b", &[0.0, 1.0])]);
        let tokens: Vec<String> = (0..2_500)
            .map(|i| if i % 2 == 0 { "a" } else { "zzz" })
            .map(String::from)
            .collect();
        let progress = ProgressTracker::new();
        let groups = group_chunk_with_progress(&tokens, &table, 0.5, &progress);
        assert_eq!(progress.processed(), 2_500);
        assert_eq!(groups, group_chunk(&tokens, &table, 0.5));
    }
}
