use std::sync::Arc;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::posting::InvList;
use crate::index::term_vector::TermVector;

/// Read-only view of a positional inverted index.
///
/// Implementations are shared across queries behind an `Arc`; all per-query
/// iteration state lives in the operator tree, so a reader only ever answers
/// lookups. Every method is fallible because a disk-backed reader can fail
/// mid-query; such failures are fatal to the query that hit them.
pub trait IndexReader: Send + Sync {
    /// Total number of documents in the index.
    fn num_docs(&self) -> Result<u32>;

    /// Number of documents that contain the field at all.
    fn doc_count(&self, field: &str) -> Result<u32>;

    /// Total number of token positions across all documents' field.
    fn sum_of_field_lengths(&self, field: &str) -> Result<u64>;

    /// Token positions in one document's field; 0 when the field is absent.
    fn field_length(&self, field: &str, doc_id: DocId) -> Result<u32>;

    /// Postings for (field, term); None when the term never occurs there.
    fn inverted_list(&self, field: &str, term: &str) -> Result<Option<Arc<InvList>>>;

    /// Collection term frequency of (field, term).
    fn total_term_freq(&self, field: &str, term: &str) -> Result<u64>;

    fn internal_docid(&self, external_id: &str) -> Result<Option<DocId>>;

    fn external_docid(&self, doc_id: DocId) -> Result<String>;

    /// Forward view of one document's field; None when the field is absent.
    fn term_vector(&self, doc_id: DocId, field: &str) -> Result<Option<TermVector>>;

    /// Per-document metadata attribute (spam score, raw URL, PageRank, ...).
    fn attribute(&self, name: &str, doc_id: DocId) -> Result<Option<String>>;
}
