use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::reader::IndexReader;
use crate::scoring::model::{Bm25Params, IndriParams};
use crate::search::results::ScoreList;

/// The feature ids a learning-to-rank run computes. Ids 1..=20; any subset.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    enabled: BTreeSet<u32>,
}

impl FeatureSet {
    pub fn all() -> Self {
        FeatureSet { enabled: (1..=20).collect() }
    }

    /// All features except the listed ids.
    pub fn without(disabled: &[u32]) -> Self {
        let mut set = Self::all();
        for id in disabled {
            set.enabled.remove(id);
        }
        set
    }

    pub fn contains(&self, id: u32) -> bool {
        self.enabled.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.enabled.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Raw per-document feature values; `None` marks a feature the document
/// cannot produce (missing attribute, missing field). Missing is distinct
/// from 0.0 until normalization.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub external_id: String,
    pub values: BTreeMap<u32, Option<f64>>,
}

/// Computes query-document feature vectors for an external ranker.
///
/// Features:
///  1  spam score attribute
///  2  URL depth (count of '/' in the raw URL)
///  3  Wikipedia flag
///  4  PageRank attribute
///  5/8/11/14   BM25 over the body/title/url/inlink term vector
///  6/9/12/15   Indri over the same term vectors
///  7/10/13/16  query term overlap fraction over the same term vectors
///  17 sqrt of the keywords field length
///  18 Boolean-AND tf (min tf over query terms present in body)
///  19 negative tf standard deviation over query terms present in body
///  20 inlink authority (weighted domain-token occurrences)
pub struct FeatureExtractor {
    pub index: Arc<dyn IndexReader>,
    pub analyzer: Analyzer,
    pub features: FeatureSet,
    pub bm25: Bm25Params,
    pub indri: IndriParams,
}

impl FeatureExtractor {
    pub fn new(index: Arc<dyn IndexReader>, analyzer: Analyzer) -> Self {
        FeatureExtractor {
            index,
            analyzer,
            features: FeatureSet::all(),
            bm25: Bm25Params::default(),
            indri: IndriParams::default(),
        }
    }

    /// Analyze a raw query into the stems features are computed against.
    pub fn query_terms(&self, query: &str) -> Vec<String> {
        self.analyzer.analyze(query).into_iter().map(|t| t.text).collect()
    }

    /// Feature vector for one document, or None when the external id is
    /// unknown to the index.
    pub fn extract(
        &self,
        query_terms: &[String],
        external_id: &str,
    ) -> Result<Option<FeatureVector>> {
        let Some(doc_id) = self.index.internal_docid(external_id)? else {
            return Ok(None);
        };
        let raw_url = self.index.attribute("rawUrl", doc_id)?;

        let mut values = BTreeMap::new();
        for id in self.features.iter() {
            let value = match id {
                1 => self
                    .index
                    .attribute("spamScore", doc_id)?
                    .and_then(|s| s.parse().ok()),
                2 => raw_url.as_deref().map(|url| url.matches('/').count() as f64),
                3 => raw_url
                    .as_deref()
                    .map(|url| if url.contains("wikipedia.org") { 1.0 } else { 0.0 }),
                4 => self
                    .index
                    .attribute("PageRank", doc_id)?
                    .and_then(|s| s.parse().ok()),
                5 => self.bm25_over_vector(doc_id, query_terms, "body")?,
                6 => self.indri_over_vector(doc_id, query_terms, "body")?,
                7 => self.overlap(doc_id, query_terms, "body")?,
                8 => self.bm25_over_vector(doc_id, query_terms, "title")?,
                9 => self.indri_over_vector(doc_id, query_terms, "title")?,
                10 => self.overlap(doc_id, query_terms, "title")?,
                11 => self.bm25_over_vector(doc_id, query_terms, "url")?,
                12 => self.indri_over_vector(doc_id, query_terms, "url")?,
                13 => self.overlap(doc_id, query_terms, "url")?,
                14 => self.bm25_over_vector(doc_id, query_terms, "inlink")?,
                15 => self.indri_over_vector(doc_id, query_terms, "inlink")?,
                16 => self.overlap(doc_id, query_terms, "inlink")?,
                17 => {
                    let len = self.index.field_length("keywords", doc_id)?;
                    if len > 0 { Some((len as f64).sqrt()) } else { None }
                }
                18 => self.min_tf(doc_id, query_terms, "body")?,
                19 => self.tf_deviation(doc_id, query_terms, "body")?,
                20 => self.inlink_authority(doc_id)?,
                _ => None,
            };
            values.insert(id, value);
        }
        Ok(Some(FeatureVector { external_id: external_id.to_string(), values }))
    }

    /// BM25 summed over the query terms present in the document's term
    /// vector; missing vector means missing feature.
    fn bm25_over_vector(
        &self,
        doc_id: DocId,
        terms: &[String],
        field: &str,
    ) -> Result<Option<f64>> {
        let Some(vector) = self.index.term_vector(doc_id, field)? else {
            return Ok(None);
        };
        let doc_len = self.index.field_length(field, doc_id)? as f64;
        let doc_count = self.index.doc_count(field)? as f64;
        let avg_doc_len = self.index.sum_of_field_lengths(field)? as f64 / doc_count;
        let num_docs = self.index.num_docs()? as f64;

        let mut score = 0.0;
        for term in terms {
            if let Some(slot) = vector.index_of_stem(term) {
                let tf = vector.stem_freq(slot).unwrap_or(0) as f64;
                let df = vector.stem_df(slot).unwrap_or(0) as f64;
                score += self.bm25.term_score(tf, df, num_docs, doc_len, avg_doc_len);
            }
        }
        Ok(Some(score))
    }

    /// Indri geometric mean over ALL query terms (absent terms at tf = 0),
    /// except 0.0 when no query term is present at all.
    fn indri_over_vector(
        &self,
        doc_id: DocId,
        terms: &[String],
        field: &str,
    ) -> Result<Option<f64>> {
        let Some(vector) = self.index.term_vector(doc_id, field)? else {
            return Ok(None);
        };
        let doc_len = self.index.field_length(field, doc_id)? as f64;
        let sum_len = self.index.sum_of_field_lengths(field)? as f64;

        let mut score = 1.0;
        let mut present = 0usize;
        for term in terms {
            let tf = match vector.index_of_stem(term) {
                Some(slot) => {
                    present += 1;
                    vector.stem_freq(slot).unwrap_or(0) as f64
                }
                None => 0.0,
            };
            let ctf = self.index.total_term_freq(field, term)? as f64;
            score *= self.indri.term_score(tf, ctf, doc_len, sum_len);
        }
        if present == 0 {
            Ok(Some(0.0))
        } else {
            Ok(Some(score.powf(1.0 / terms.len() as f64)))
        }
    }

    /// Fraction of query terms present in the term vector.
    fn overlap(&self, doc_id: DocId, terms: &[String], field: &str) -> Result<Option<f64>> {
        let Some(vector) = self.index.term_vector(doc_id, field)? else {
            return Ok(None);
        };
        if terms.is_empty() {
            return Ok(Some(0.0));
        }
        let present = terms.iter().filter(|t| vector.index_of_stem(t).is_some()).count();
        Ok(Some(present as f64 / terms.len() as f64))
    }

    /// Minimum tf over the query terms present; 0.0 when none is present.
    fn min_tf(&self, doc_id: DocId, terms: &[String], field: &str) -> Result<Option<f64>> {
        let Some(vector) = self.index.term_vector(doc_id, field)? else {
            return Ok(None);
        };
        let mut min: Option<u32> = None;
        for term in terms {
            if let Some(slot) = vector.index_of_stem(term) {
                let tf = vector.stem_freq(slot).unwrap_or(0);
                min = Some(min.map_or(tf, |m| m.min(tf)));
            }
        }
        Ok(Some(min.map_or(0.0, |m| m as f64)))
    }

    /// Negative population standard deviation of the tfs of the query terms
    /// present; missing when none is present.
    fn tf_deviation(&self, doc_id: DocId, terms: &[String], field: &str) -> Result<Option<f64>> {
        let Some(vector) = self.index.term_vector(doc_id, field)? else {
            return Ok(None);
        };
        let tfs: Vec<f64> = terms
            .iter()
            .filter_map(|t| vector.index_of_stem(t))
            .map(|slot| vector.stem_freq(slot).unwrap_or(0) as f64)
            .collect();
        if tfs.is_empty() {
            return Ok(None);
        }
        let mean = tfs.iter().sum::<f64>() / tfs.len() as f64;
        let variance = tfs.iter().map(|tf| (mean - tf).powi(2)).sum::<f64>() / tfs.len() as f64;
        Ok(Some(-variance.sqrt()))
    }

    /// Weighted count of authority tokens in the inlink field: 1.0 for
    /// gov/edu/org occurrences, 0.2 for net/com occurrences.
    fn inlink_authority(&self, doc_id: DocId) -> Result<Option<f64>> {
        let Some(vector) = self.index.term_vector(doc_id, "inlink")? else {
            return Ok(None);
        };
        let mut score = 0.0;
        for position in 0..vector.positions_length() {
            let Some(slot) = vector.stem_at(position) else { continue };
            if slot == 0 {
                continue;
            }
            let Some(stem) = vector.stem_string(slot) else { continue };
            if stem == "gov" || stem == "edu" || stem == "org" || stem.contains(".org") {
                score += 1.0;
            } else if stem == "net" || stem == "com" || stem.contains(".com") {
                score += 0.2;
            }
        }
        Ok(Some(score))
    }
}

/// Per-query min-max normalization to [0, 1]. Missing features and features
/// with zero range across the query's documents come out as 0.0.
pub fn normalize_features(
    vectors: &[FeatureVector],
    features: &FeatureSet,
) -> Vec<BTreeMap<u32, f64>> {
    let mut out: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); vectors.len()];
    for id in features.iter() {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for vector in vectors {
            if let Some(value) = vector.values.get(&id).copied().flatten() {
                min = min.min(value);
                max = max.max(value);
            }
        }
        let range = max - min;
        for (row, vector) in out.iter_mut().zip(vectors) {
            let normalized = match vector.values.get(&id).copied().flatten() {
                Some(value) if range.is_finite() && range != 0.0 => (value - min) / range,
                _ => 0.0,
            };
            row.insert(id, normalized);
        }
    }
    out
}

/// One SVMrank input line: `label qid:QID id:value ... # external_id`,
/// feature ids ascending.
pub fn svmrank_line(
    label: f64,
    query_id: &str,
    values: &BTreeMap<u32, f64>,
    external_id: &str,
) -> String {
    let pairs: Vec<String> = values
        .iter()
        .map(|(id, value)| format!("{}:{}", id, value))
        .collect();
    format!("{} qid:{} {} # {}", label, query_id, pairs.join(" "), external_id)
}

/// Re-rank feature rows with externally produced model scores: one score
/// per `(query id, docid)` row, grouped by query, ranked and truncated.
/// Query order follows first appearance in `rows`.
pub fn rerank(
    rows: &[(String, DocId)],
    scores: &[f64],
    output_length: usize,
) -> Result<Vec<(String, ScoreList)>> {
    if rows.len() != scores.len() {
        return Err(Error::invalid_argument(format!(
            "{} feature rows but {} scores",
            rows.len(),
            scores.len()
        )));
    }
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, ScoreList> = HashMap::new();
    for ((query_id, doc_id), score) in rows.iter().zip(scores) {
        if !grouped.contains_key(query_id) {
            order.push(query_id.clone());
            grouped.insert(query_id.clone(), ScoreList::new());
        }
        if let Some(list) = grouped.get_mut(query_id) {
            list.add(*doc_id, *score);
        }
    }
    let mut out = Vec::with_capacity(order.len());
    for query_id in order {
        if let Some(mut list) = grouped.remove(&query_id) {
            list.sort();
            list.truncate(output_length);
            out.push((query_id, list));
        }
    }
    Ok(out)
}
