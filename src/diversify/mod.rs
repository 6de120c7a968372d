use std::collections::HashMap;

use serde::{Serialize, Deserialize};

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::scoring::model::RetrievalModel;
use crate::search::executor::QueryExecutor;
use crate::search::results::ScoreList;

/// Greedy re-ranking strategy that redistributes a ranking across intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiversityAlgorithm {
    Xquad,
    Pm2,
}

/// Knobs for diversified re-ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversifyParams {
    pub algorithm: DiversityAlgorithm,
    pub lambda: f64,              // 0 = pure relevance, 1 = pure diversity
    pub max_input_length: usize,  // ranking depth considered for re-ranking
    pub max_result_length: usize, // re-ranked results kept
}

impl Default for DiversifyParams {
    fn default() -> Self {
        DiversifyParams {
            algorithm: DiversityAlgorithm::Xquad,
            lambda: 0.5,
            max_input_length: 100,
            max_result_length: 100,
        }
    }
}

/// One row per document of the truncated ranking: column 0 holds the
/// original relevance score, column i the i-th intent's score for that
/// document. Documents outside the truncated ranking are dropped entirely,
/// and intent scores are read only from each intent ranking's own head.
struct ScoreMatrix {
    docs: Vec<DocId>,
    rows: Vec<Vec<f64>>,
}

impl DiversifyParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(Error::invalid_argument(format!(
                "diversity lambda must be in [0.0, 1.0], got {}",
                self.lambda
            )));
        }
        if self.max_input_length == 0 || self.max_result_length == 0 {
            return Err(Error::invalid_argument(
                "diversity ranking lengths must be at least 1",
            ));
        }
        Ok(())
    }

    /// Re-rank one query's retrieval against its intents' retrievals.
    /// All rankings must be sorted best-first.
    pub fn diversify(&self, ranking: &ScoreList, intents: &[ScoreList]) -> Result<ScoreList> {
        self.validate()?;
        let matrix = self.build_matrix(ranking, intents);
        let mut out = match self.algorithm {
            DiversityAlgorithm::Xquad => xquad(&matrix, self.lambda, self.max_result_length),
            DiversityAlgorithm::Pm2 => pm2(&matrix, self.lambda, self.max_result_length),
        };
        out.sort();
        out.truncate(self.max_result_length);
        Ok(out)
    }

    /// Run the query and each intent through the executor, then diversify.
    pub fn diversify_query(
        &self,
        executor: &QueryExecutor,
        query: &str,
        intents: &[&str],
        model: &RetrievalModel,
    ) -> Result<ScoreList> {
        let mut ranking = executor.process_query(query, model)?;
        ranking.sort();
        let mut intent_lists = Vec::with_capacity(intents.len());
        for intent in intents {
            let mut list = executor.process_query(intent, model)?;
            list.sort();
            intent_lists.push(list);
        }
        self.diversify(&ranking, &intent_lists)
    }

    fn build_matrix(&self, ranking: &ScoreList, intents: &[ScoreList]) -> ScoreMatrix {
        let len = self.max_input_length.min(ranking.len());
        let mut docs = Vec::with_capacity(len);
        let mut rows = vec![vec![0.0; intents.len() + 1]; len];
        let mut rank_of: HashMap<DocId, usize> = HashMap::new();
        let mut needs_scaling = false;

        for (rank, entry) in ranking.entries.iter().take(len).enumerate() {
            docs.push(entry.doc_id);
            rank_of.insert(entry.doc_id, rank);
            rows[rank][0] = entry.score;
            needs_scaling |= entry.score > 1.0;
        }
        for (i, intent) in intents.iter().enumerate() {
            for entry in intent.entries.iter().take(len) {
                if let Some(&rank) = rank_of.get(&entry.doc_id) {
                    rows[rank][i + 1] = entry.score;
                    needs_scaling |= entry.score > 1.0;
                }
            }
        }
        if needs_scaling {
            scale(&mut rows);
        }
        ScoreMatrix { docs, rows }
    }
}

/// Divide every cell by the largest column sum, so retrieval scores that are
/// not probabilities (BM25) land in a range the coverage products tolerate.
fn scale(rows: &mut [Vec<f64>]) {
    let columns = rows.first().map_or(0, |row| row.len());
    let mut sums = vec![0.0; columns];
    for row in rows.iter() {
        for (sum, value) in sums.iter_mut().zip(row) {
            *sum += value;
        }
    }
    let base = sums.iter().copied().fold(0.0_f64, f64::max);
    if base > 0.0 {
        for row in rows {
            for value in row {
                *value /= base;
            }
        }
    }
}

/// xQuAD: each round picks the document maximizing
/// `(1 - lambda) * relevance + lambda * sum_i w_i * s_i * coverage_i`,
/// then shrinks every intent's coverage by `1 - s_i` of the pick. Intents
/// already covered by earlier picks stop attracting similar documents.
fn xquad(matrix: &ScoreMatrix, lambda: f64, max_result_length: usize) -> ScoreList {
    let intent_count = matrix.rows.first().map_or(0, |row| row.len() - 1);
    let intent_weight = 1.0 / intent_count.max(1) as f64;
    let mut coverage = vec![1.0; intent_count + 1];
    let mut remaining = vec![true; matrix.rows.len()];
    let limit = max_result_length.min(matrix.rows.len());
    let mut out = ScoreList::new();

    while out.len() < limit {
        let mut best: Option<(usize, f64)> = None;
        for (row_idx, row) in matrix.rows.iter().enumerate() {
            if !remaining[row_idx] {
                continue;
            }
            let mut diversity = 0.0;
            for i in 1..=intent_count {
                diversity += intent_weight * row[i] * coverage[i];
            }
            let score = (1.0 - lambda) * row[0] + lambda * diversity;
            // strict comparison keeps the earlier-ranked document on ties
            if best.map_or(true, |(_, top)| top < score) {
                best = Some((row_idx, score));
            }
        }
        let Some((chosen, score)) = best else { break };
        for i in 1..=intent_count {
            coverage[i] *= 1.0 - matrix.rows[chosen][i];
        }
        remaining[chosen] = false;
        out.add(matrix.docs[chosen], score);
    }
    out
}

/// PM-2: each round the intent furthest below its proportional share of
/// result slots claims the round; documents score
/// `lambda * qt_claim * s_claim + (1 - lambda) * sum_others qt_i * s_i`,
/// and the pick's slot credit is split across intents by its score mass.
///
/// When no remaining document covers any intent the round's best score is
/// zero; the rest of the ranking is emitted in its original order at a
/// decaying score so output stays a total order.
fn pm2(matrix: &ScoreMatrix, lambda: f64, max_result_length: usize) -> ScoreList {
    let intent_count = matrix.rows.first().map_or(0, |row| row.len() - 1);
    let mut slots = vec![0.0; intent_count + 1];
    let mut remaining = vec![true; matrix.rows.len()];
    let limit = max_result_length.min(matrix.rows.len());
    let slot_target = limit as f64 / intent_count.max(1) as f64;
    let mut out = ScoreList::new();

    while out.len() < limit {
        let mut priorities = vec![0.0; intent_count + 1];
        let mut claiming = 0usize;
        for i in 1..=intent_count {
            priorities[i] = slot_target / (2.0 * slots[i] + 1.0);
            if claiming == 0 || priorities[claiming] < priorities[i] {
                claiming = i;
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (row_idx, row) in matrix.rows.iter().enumerate() {
            if !remaining[row_idx] {
                continue;
            }
            let mut claimed = 0.0;
            let mut others = 0.0;
            for i in 1..=intent_count {
                if i == claiming {
                    claimed = priorities[i] * row[i];
                } else {
                    others += priorities[i] * row[i];
                }
            }
            let score = lambda * claimed + (1.0 - lambda) * others;
            if best.map_or(true, |(_, top)| top < score) {
                best = Some((row_idx, score));
            }
        }
        let Some((chosen, score)) = best else { break };

        if score == 0.0 {
            let mut last = out.entries.last().map_or(1.0, |entry| entry.score);
            for (row_idx, doc) in matrix.docs.iter().enumerate() {
                if out.len() >= limit {
                    break;
                }
                if remaining[row_idx] {
                    last *= 0.8;
                    out.add(*doc, last);
                    remaining[row_idx] = false;
                }
            }
            return out;
        }

        let mass: f64 = (1..=intent_count).map(|i| matrix.rows[chosen][i]).sum();
        for i in 1..=intent_count {
            slots[i] += matrix.rows[chosen][i] / mass;
        }
        remaining[chosen] = false;
        out.add(matrix.docs[chosen], score);
    }
    out
}
