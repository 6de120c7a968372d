use serde::{Serialize, Deserialize};

use crate::core::types::DocId;

/// One (document, score) pair in a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub doc_id: DocId,
    pub score: f64,
}

/// Ranked results of one query. The driver appends entries in ascending
/// docid order; `sort` produces the final ranking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreList {
    pub entries: Vec<ScoreEntry>,
}

impl ScoreList {
    pub fn new() -> Self {
        ScoreList { entries: Vec::new() }
    }

    pub fn add(&mut self, doc_id: DocId, score: f64) {
        self.entries.push(ScoreEntry { doc_id, score });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score descending, ties broken by docid ascending. Total over the
    /// entries, so sorting a sorted list changes nothing.
    pub fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
    }

    pub fn truncate(&mut self, n: usize) {
        self.entries.truncate(n);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoreEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a ScoreList {
    type Item = &'a ScoreEntry;
    type IntoIter = std::slice::Iter<'a, ScoreEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
