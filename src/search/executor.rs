use std::sync::Arc;

use crate::core::config::SearchConfig;
use crate::core::error::Result;
use crate::index::reader::IndexReader;
use crate::query::parser::QueryParser;
use crate::scoring::model::RetrievalModel;
use crate::search::results::ScoreList;

/// Parses query strings and drives their operator trees against an index.
pub struct QueryExecutor {
    pub index: Arc<dyn IndexReader>,
    pub parser: QueryParser,
    pub config: SearchConfig,
}

impl QueryExecutor {
    pub fn new(index: Arc<dyn IndexReader>, parser: QueryParser, config: SearchConfig) -> Self {
        QueryExecutor { index, parser, config }
    }

    /// Evaluate one query under the given model. The raw string is wrapped
    /// with the model's default operator before parsing, so `apple pie` and
    /// `#near/2( apple pie )` are both complete queries. Entries come back
    /// in ascending docid order; ranking is `search`'s concern.
    pub fn process_query(&self, query: &str, model: &RetrievalModel) -> Result<ScoreList> {
        model.validate()?;
        let wrapped = format!("{}( {} )", model.default_operator(), query);
        let mut root = self.parser.parse(&wrapped)?;
        log::debug!("query tree: {}", root);

        let mut results = ScoreList::new();
        if root.arg_count() == 0 {
            return Ok(results);
        }
        root.initialize(&self.index, model)?;
        while root.doc_iterator_has_match(model) {
            let Some(doc_id) = root.doc_iterator_get_match() else { break };
            results.add(doc_id, root.get_score(model)?);
            root.doc_iterator_advance_past(doc_id);
        }
        Ok(results)
    }

    /// `process_query` under the configured model, ranked and truncated to
    /// the configured output length. When the config carries an expansion
    /// section the query is rewritten by pseudo-relevance feedback first.
    pub fn search(&self, query: &str) -> Result<ScoreList> {
        let model = self.config.model;
        let expanded = match &self.config.expansion {
            Some(expansion) => {
                let rewritten = expansion.expand(self, query, &model)?;
                log::debug!("expanded query: {}", rewritten);
                rewritten
            }
            None => query.to_string(),
        };
        let mut results = self.process_query(&expanded, &model)?;
        results.sort();
        results.truncate(self.config.output_length);
        Ok(results)
    }

    /// Diversified retrieval: run the query and each intent under the
    /// configured model, then re-rank with the configured diversity section
    /// (defaults when the section is absent).
    pub fn search_diversified(&self, query: &str, intents: &[&str]) -> Result<ScoreList> {
        let params = self.config.diversity.clone().unwrap_or_default();
        params.diversify_query(self, query, intents, &self.config.model)
    }

    /// Evaluate `(query id, query)` pairs in order. A failing query is
    /// reported and yields an empty ranking; the batch always completes.
    pub fn run_batch(&self, queries: &[(String, String)]) -> Vec<(String, ScoreList)> {
        let mut out = Vec::with_capacity(queries.len());
        for (query_id, query) in queries {
            let results = match self.search(query) {
                Ok(results) => results,
                Err(err) => {
                    log::warn!("query {} failed: {}", query_id, err);
                    ScoreList::new()
                }
            };
            out.push((query_id.clone(), results));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::index::memory::MemoryIndex;
    use crate::scoring::model::{Bm25Params, IndriParams};

    fn executor(docs: &[&str], model: RetrievalModel) -> QueryExecutor {
        let mut index = MemoryIndex::with_analyzer(Analyzer::plain());
        for (i, body) in docs.iter().enumerate() {
            index.add_document(&format!("D{}", i + 1), &[("body", body)]).unwrap();
        }
        QueryExecutor::new(
            Arc::new(index),
            QueryParser::new(Analyzer::plain()),
            SearchConfig { model, ..SearchConfig::default() },
        )
    }

    fn ranking(results: &ScoreList) -> Vec<(u32, f64)> {
        results.iter().map(|e| (e.doc_id.0, e.score)).collect()
    }

    #[test]
    fn boolean_and_returns_the_intersection() {
        let exec = executor(&["a b", "a c", "b c"], RetrievalModel::UnrankedBoolean);
        let results = exec.search("#and( a b )").unwrap();
        assert_eq!(ranking(&results), vec![(0, 1.0)]);
    }

    #[test]
    fn tied_scores_rank_by_docid() {
        let exec = executor(&["b a", "a b"], RetrievalModel::RankedBoolean);
        let results = exec.search("a b").unwrap();
        assert_eq!(ranking(&results), vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn default_operator_follows_the_model() {
        let docs = ["a x", "b y"];

        // unranked boolean wraps with #or: union
        let exec = executor(&docs, RetrievalModel::UnrankedBoolean);
        assert_eq!(exec.search("a b").unwrap().len(), 2);

        // ranked boolean wraps with #and: intersection
        let exec = executor(&docs, RetrievalModel::RankedBoolean);
        assert_eq!(exec.search("a b").unwrap().len(), 0);
    }

    #[test]
    fn bm25_ranks_rarer_terms_higher() {
        let exec = executor(
            &["a b", "b c", "b c", "b"],
            RetrievalModel::Bm25(Bm25Params::default()),
        );
        let results = exec.search("a c").unwrap();

        // a is rarer than c, so its lone document outranks both c documents
        assert_eq!(results.entries[0].doc_id.0, 0);
        assert!(results.entries[0].score > results.entries[1].score);
    }

    #[test]
    fn indri_surfaces_partial_matches() {
        let exec = executor(
            &["a b", "b c"],
            RetrievalModel::Indri(IndriParams { mu: 1000.0, lambda: 0.0 }),
        );
        let results = exec.search("a z").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.entries[0].doc_id.0, 0);
    }

    #[test]
    fn empty_query_yields_empty_results() {
        let mut index = MemoryIndex::new();
        index.add_document("D1", &[("body", "quick fox")]).unwrap();
        let exec = QueryExecutor::new(
            Arc::new(index),
            QueryParser::new(Analyzer::standard_english()),
            SearchConfig::default(),
        );

        // every token is a stopword, so the wrapped operator has no children
        let results = exec.search("the of").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn output_length_truncates_the_ranking() {
        let mut exec = executor(&["a", "a a", "a a a"], RetrievalModel::RankedBoolean);
        exec.config.output_length = 2;
        let results = exec.search("a").unwrap();
        assert_eq!(ranking(&results), vec![(2, 3.0), (1, 2.0)]);
    }

    #[test]
    fn batch_contains_per_query_failures() {
        let exec = executor(&["a b"], RetrievalModel::UnrankedBoolean);
        let queries = vec![
            ("1".to_string(), "#near( a b )".to_string()),
            ("2".to_string(), "a".to_string()),
        ];
        let results = exec.run_batch(&queries);

        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_empty());
        assert_eq!(results[1].1.len(), 1);
    }

    #[test]
    fn invalid_model_parameters_are_rejected() {
        let exec = executor(&["a"], RetrievalModel::Bm25(Bm25Params { b: 2.0, ..Bm25Params::default() }));
        assert!(exec.search("a").is_err());
    }

    #[test]
    fn configured_expansion_widens_the_match_set() {
        let mut exec = executor(
            &["apple pie dessert", "dessert cake"],
            RetrievalModel::Indri(IndriParams::default()),
        );
        exec.config.expansion = Some(crate::feedback::ExpansionParams::default());

        // "apple" alone matches only the first document; the feedback terms
        // drawn from it pull in the second through the #wand rewrite
        let results = exec.search("apple").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.entries[0].doc_id.0, 0);
    }

    #[test]
    fn diversified_search_spreads_across_intents() {
        let mut exec = executor(
            &["jaguar car speed", "jaguar car engine", "jaguar cat jungle"],
            RetrievalModel::UnrankedBoolean,
        );
        exec.config.diversity = Some(crate::diversify::DiversifyParams {
            lambda: 0.5,
            ..crate::diversify::DiversifyParams::default()
        });

        let results = exec.search_diversified("jaguar", &["car", "cat"]).unwrap();
        let order: Vec<u32> = results.iter().map(|e| e.doc_id.0).collect();
        // the cat document jumps over the second car document
        assert_eq!(order, [0, 2, 1]);
    }
}
