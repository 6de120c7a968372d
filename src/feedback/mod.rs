use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::error::{Error, Result};
use crate::index::reader::IndexReader;
use crate::scoring::model::RetrievalModel;
use crate::search::executor::QueryExecutor;
use crate::search::results::ScoreList;

/// Knobs for Indri pseudo-relevance feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionParams {
    pub num_docs: usize,    // feedback documents taken from the initial ranking
    pub num_terms: usize,   // expansion terms kept
    pub mu: f64,            // Dirichlet prior for expansion term scoring
    pub orig_weight: f64,   // weight of the original query in the rewrite
    pub field: String,
}

impl Default for ExpansionParams {
    fn default() -> Self {
        ExpansionParams {
            num_docs: 10,
            num_terms: 10,
            mu: 0.0,
            orig_weight: 0.5,
            field: "body".to_string(),
        }
    }
}

struct Candidate {
    term: String,
    p_mle: f64,
    score: f64,
}

impl ExpansionParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_docs == 0 || self.num_terms == 0 {
            return Err(Error::invalid_argument(
                "feedback num_docs and num_terms must be at least 1",
            ));
        }
        if self.mu < 0.0 {
            return Err(Error::invalid_argument(format!(
                "feedback mu must be >= 0.0, got {}",
                self.mu
            )));
        }
        if !(0.0..=1.0).contains(&self.orig_weight) {
            return Err(Error::invalid_argument(format!(
                "feedback orig_weight must be in [0.0, 1.0], got {}",
                self.orig_weight
            )));
        }
        Ok(())
    }

    /// Build a `#wand ( w term ... )` expansion query from the top documents
    /// of a ranking (usually the initial retrieval, but any ranking works).
    ///
    /// Candidate terms come from the top documents' term vectors. Every
    /// candidate is scored against every top document, absent terms at
    /// tf = 0, so a term concentrated in one strong document can still beat
    /// a term spread thinly across all of them.
    pub fn expansion_query(
        &self,
        index: &Arc<dyn IndexReader>,
        ranking: &ScoreList,
    ) -> Result<String> {
        self.validate()?;
        let top = &ranking.entries[..ranking.len().min(self.num_docs)];

        let mut stems: BTreeSet<String> = BTreeSet::new();
        for entry in top {
            let Some(vector) = index.term_vector(entry.doc_id, &self.field)? else {
                continue;
            };
            for slot in 1..vector.stems_length() {
                if let Some(stem) = vector.stem_string(slot) {
                    if is_expandable(stem) {
                        stems.insert(stem.to_string());
                    }
                }
            }
        }

        let sum_len = index.sum_of_field_lengths(&self.field)? as f64;
        let mut candidates = Vec::with_capacity(stems.len());
        for term in stems {
            let ctf = index.total_term_freq(&self.field, &term)? as f64;
            candidates.push(Candidate { term, p_mle: ctf / sum_len, score: 0.0 });
        }

        for entry in top {
            let Some(vector) = index.term_vector(entry.doc_id, &self.field)? else {
                continue;
            };
            let doc_len = index.field_length(&self.field, entry.doc_id)? as f64;
            for candidate in candidates.iter_mut() {
                let tf = vector
                    .index_of_stem(&candidate.term)
                    .and_then(|slot| vector.stem_freq(slot))
                    .unwrap_or(0) as f64;
                let p_doc = (tf + self.mu * candidate.p_mle) / (doc_len + self.mu);
                let idf = (1.0 / candidate.p_mle).ln();
                candidate.score += entry.score * p_doc * idf;
            }
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.term.cmp(&b.term)));
        candidates.truncate(self.num_terms);

        let parts: Vec<String> = candidates
            .iter()
            .map(|c| format!("{:.4} {}", c.score, c.term))
            .collect();
        Ok(format!("#wand ( {} )", parts.join(" ")))
    }

    /// Blend the original query with an expansion query.
    pub fn rewrite_query(&self, original: &str, expansion: &str) -> String {
        format!(
            "#wand ( {} #and ( {} ) {} {} )",
            self.orig_weight,
            original,
            1.0 - self.orig_weight,
            expansion
        )
    }

    /// Run the initial retrieval, expand from its top documents, and return
    /// the rewritten query. Indri only; the expansion scoring assumes
    /// language-model document scores.
    pub fn expand(
        &self,
        executor: &QueryExecutor,
        query: &str,
        model: &RetrievalModel,
    ) -> Result<String> {
        if !matches!(model, RetrievalModel::Indri(_)) {
            return Err(Error::unsupported("query expansion", model.name()));
        }
        self.validate()?;
        let mut initial = executor.process_query(query, model)?;
        initial.sort();
        initial.truncate(self.num_docs);
        let expansion = self.expansion_query(&executor.index, &initial)?;
        Ok(self.rewrite_query(query, &expansion))
    }
}

/// Expansion terms must be plain ASCII without sentence punctuation, so the
/// rewritten query survives a round trip through the parser.
fn is_expandable(term: &str) -> bool {
    term.is_ascii() && !term.contains('.') && !term.contains(',')
}
