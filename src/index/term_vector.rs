use serde::{Serialize, Deserialize};

/// Forward view of one document field: the distinct stems that survived
/// analysis, their in-document and collection statistics, and a map from
/// token position to stem slot.
///
/// Slot 0 is reserved: positions holding a stopword (or any token analysis
/// discarded) point at it, so `positions_length()` still reflects the full
/// field length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermVector {
    field: String,
    stems: Vec<String>,
    stem_freqs: Vec<u32>,
    stem_dfs: Vec<u32>,
    positions: Vec<usize>,
}

impl TermVector {
    pub fn new(
        field: impl Into<String>,
        stems: Vec<String>,
        stem_freqs: Vec<u32>,
        stem_dfs: Vec<u32>,
        positions: Vec<usize>,
    ) -> Self {
        debug_assert_eq!(stems.len(), stem_freqs.len());
        debug_assert_eq!(stems.len(), stem_dfs.len());
        debug_assert!(stems.first().map_or(false, |s| s.is_empty()), "slot 0 is reserved");
        debug_assert!(positions.iter().all(|&s| s < stems.len()));
        TermVector {
            field: field.into(),
            stems,
            stem_freqs,
            stem_dfs,
            positions,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Number of stem slots, the reserved slot 0 included.
    pub fn stems_length(&self) -> usize {
        self.stems.len()
    }

    /// Field length in token positions, stopword positions included.
    pub fn positions_length(&self) -> usize {
        self.positions.len()
    }

    pub fn stem_string(&self, slot: usize) -> Option<&str> {
        self.stems.get(slot).map(|s| s.as_str())
    }

    /// Frequency of the stem within this document.
    pub fn stem_freq(&self, slot: usize) -> Option<u32> {
        self.stem_freqs.get(slot).copied()
    }

    /// Number of documents in the collection containing the stem.
    pub fn stem_df(&self, slot: usize) -> Option<u32> {
        self.stem_dfs.get(slot).copied()
    }

    /// Stem slot occupying a token position.
    pub fn stem_at(&self, position: usize) -> Option<usize> {
        self.positions.get(position).copied()
    }

    pub fn index_of_stem(&self, stem: &str) -> Option<usize> {
        // slot 0 is not a real stem
        self.stems.iter().skip(1).position(|s| s == stem).map(|i| i + 1)
    }
}
