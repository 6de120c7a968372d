use serde::{Serialize, Deserialize};
use crate::core::types::DocId;

/// Occurrences of one term (or positional-operator match) in one document.
/// Positions are strictly ascending; tf is their count, so it is never 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: DocId, positions: Vec<u32>) -> Self {
        debug_assert!(!positions.is_empty());
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        Posting { doc_id, positions }
    }

    pub fn tf(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Inverted list: postings sorted by ascending doc id, tagged with the field
/// they were drawn from. TERM lists come from the index; NEAR/WINDOW build
/// derived lists whose df/ctf reflect the derived postings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvList {
    pub field: String,
    pub postings: Vec<Posting>,
}

impl InvList {
    pub fn new(field: impl Into<String>) -> Self {
        InvList {
            field: field.into(),
            postings: Vec::new(),
        }
    }

    /// Append a posting. Doc ids must arrive in ascending order.
    pub fn append_posting(&mut self, doc_id: DocId, positions: Vec<u32>) {
        debug_assert!(
            self.postings.last().map_or(true, |p| p.doc_id < doc_id),
            "postings must be appended in ascending doc id order"
        );
        self.postings.push(Posting::new(doc_id, positions));
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Document frequency: number of documents in the list.
    pub fn df(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Collection term frequency: total occurrences across the list.
    pub fn ctf(&self) -> u64 {
        self.postings.iter().map(|p| p.tf() as u64).sum()
    }
}
