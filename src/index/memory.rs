use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::posting::InvList;
use crate::index::reader::IndexReader;
use crate::index::term_vector::TermVector;

/// Surviving terms of one document field plus the raw position count.
#[derive(Debug, Clone)]
struct FieldData {
    length: u32,
    terms: Vec<(u32, String)>,
}

/// In-memory positional index for tests, demos, and small corpora.
///
/// Documents are analyzed on insertion; queries must use the same analyzer.
/// Repeated field names in one document (inlink text, say) continue the
/// position counter instead of restarting it. The reader side is shared via
/// `Arc<dyn IndexReader>`; posting lists already handed out stay valid
/// because later insertions copy-on-write.
pub struct MemoryIndex {
    analyzer: Analyzer,
    lists: HashMap<String, HashMap<String, Arc<InvList>>>,
    field_lengths: HashMap<String, Vec<u32>>,
    sum_lengths: HashMap<String, u64>,
    doc_counts: HashMap<String, u32>,
    external_ids: Vec<String>,
    internal_ids: HashMap<String, DocId>,
    forward: Vec<HashMap<String, FieldData>>,
    attributes: HashMap<String, HashMap<u32, String>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::with_analyzer(Analyzer::standard_english())
    }

    pub fn with_analyzer(analyzer: Analyzer) -> Self {
        MemoryIndex {
            analyzer,
            lists: HashMap::new(),
            field_lengths: HashMap::new(),
            sum_lengths: HashMap::new(),
            doc_counts: HashMap::new(),
            external_ids: Vec::new(),
            internal_ids: HashMap::new(),
            forward: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyze and index one document. Internal ids are dense and ascending
    /// in insertion order.
    pub fn add_document(&mut self, external_id: &str, fields: &[(&str, &str)]) -> Result<DocId> {
        if self.internal_ids.contains_key(external_id) {
            return Err(Error::invalid_argument(format!(
                "duplicate external document id '{}'",
                external_id
            )));
        }

        let doc_id = DocId(self.external_ids.len() as u32);

        let mut doc_fields: HashMap<String, FieldData> = HashMap::new();
        for (field, text) in fields {
            let (tokens, total_positions) = self.analyzer.analyze_counted(text);
            let data = doc_fields.entry(field.to_string()).or_insert(FieldData {
                length: 0,
                terms: Vec::new(),
            });
            let offset = data.length;
            for token in tokens {
                data.terms.push((offset + token.position, token.text));
            }
            data.length += total_positions;
        }

        for (field, data) in &doc_fields {
            let mut grouped: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
            for (position, term) in &data.terms {
                grouped.entry(term.as_str()).or_default().push(*position);
            }

            let field_lists = self.lists.entry(field.clone()).or_default();
            for (term, positions) in grouped {
                match field_lists.get_mut(term) {
                    Some(list) => Arc::make_mut(list).append_posting(doc_id, positions),
                    None => {
                        let mut list = InvList::new(field.clone());
                        list.append_posting(doc_id, positions);
                        field_lists.insert(term.to_string(), Arc::new(list));
                    }
                }
            }

            let lengths = self.field_lengths.entry(field.clone()).or_default();
            if lengths.len() <= doc_id.0 as usize {
                lengths.resize(doc_id.0 as usize + 1, 0);
            }
            lengths[doc_id.0 as usize] = data.length;
            *self.sum_lengths.entry(field.clone()).or_insert(0) += data.length as u64;
            *self.doc_counts.entry(field.clone()).or_insert(0) += 1;
        }

        self.external_ids.push(external_id.to_string());
        self.internal_ids.insert(external_id.to_string(), doc_id);
        self.forward.push(doc_fields);
        Ok(doc_id)
    }

    pub fn set_attribute(&mut self, doc_id: DocId, name: &str, value: &str) {
        self.attributes
            .entry(name.to_string())
            .or_default()
            .insert(doc_id.0, value.to_string());
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexReader for MemoryIndex {
    fn num_docs(&self) -> Result<u32> {
        Ok(self.external_ids.len() as u32)
    }

    fn doc_count(&self, field: &str) -> Result<u32> {
        Ok(self.doc_counts.get(field).copied().unwrap_or(0))
    }

    fn sum_of_field_lengths(&self, field: &str) -> Result<u64> {
        Ok(self.sum_lengths.get(field).copied().unwrap_or(0))
    }

    fn field_length(&self, field: &str, doc_id: DocId) -> Result<u32> {
        Ok(self
            .field_lengths
            .get(field)
            .and_then(|lengths| lengths.get(doc_id.0 as usize))
            .copied()
            .unwrap_or(0))
    }

    fn inverted_list(&self, field: &str, term: &str) -> Result<Option<Arc<InvList>>> {
        Ok(self.lists.get(field).and_then(|terms| terms.get(term)).cloned())
    }

    fn total_term_freq(&self, field: &str, term: &str) -> Result<u64> {
        Ok(self
            .lists
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|list| list.ctf())
            .unwrap_or(0))
    }

    fn internal_docid(&self, external_id: &str) -> Result<Option<DocId>> {
        Ok(self.internal_ids.get(external_id).copied())
    }

    fn external_docid(&self, doc_id: DocId) -> Result<String> {
        self.external_ids
            .get(doc_id.0 as usize)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no document with internal id {}", doc_id)))
    }

    fn term_vector(&self, doc_id: DocId, field: &str) -> Result<Option<TermVector>> {
        let doc_fields = self
            .forward
            .get(doc_id.0 as usize)
            .ok_or_else(|| Error::not_found(format!("no document with internal id {}", doc_id)))?;
        let Some(data) = doc_fields.get(field) else {
            return Ok(None);
        };

        // stem slots in term-sorted order, slot 0 reserved
        let mut stems: Vec<String> = vec![String::new()];
        let distinct: BTreeMap<&str, ()> =
            data.terms.iter().map(|(_, term)| (term.as_str(), ())).collect();
        stems.extend(distinct.keys().map(|s| s.to_string()));

        let slot_of: HashMap<&str, usize> = stems
            .iter()
            .enumerate()
            .skip(1)
            .map(|(slot, stem)| (stem.as_str(), slot))
            .collect();

        let mut stem_freqs = vec![0u32; stems.len()];
        let mut positions = vec![0usize; data.length as usize];
        for (position, term) in &data.terms {
            let slot = slot_of[term.as_str()];
            stem_freqs[slot] += 1;
            positions[*position as usize] = slot;
        }

        let field_lists = self.lists.get(field);
        let stem_dfs: Vec<u32> = stems
            .iter()
            .enumerate()
            .map(|(slot, stem)| {
                if slot == 0 {
                    0
                } else {
                    field_lists
                        .and_then(|terms| terms.get(stem))
                        .map(|list| list.df())
                        .unwrap_or(0)
                }
            })
            .collect();

        Ok(Some(TermVector::new(field, stems, stem_freqs, stem_dfs, positions)))
    }

    fn attribute(&self, name: &str, doc_id: DocId) -> Result<Option<String>> {
        Ok(self
            .attributes
            .get(name)
            .and_then(|values| values.get(&doc_id.0))
            .cloned())
    }
}
