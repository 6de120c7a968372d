//! End-to-end retrieval through the public API only: corpus in, rankings out.

use std::sync::Arc;

use quarry::analysis::analyzer::Analyzer;
use quarry::core::config::SearchConfig;
use quarry::diversify::DiversifyParams;
use quarry::feedback::ExpansionParams;
use quarry::index::memory::MemoryIndex;
use quarry::index::reader::IndexReader;
use quarry::letor::{normalize_features, svmrank_line, FeatureExtractor};
use quarry::query::parser::QueryParser;
use quarry::scoring::model::{Bm25Params, IndriParams, RetrievalModel};
use quarry::search::executor::QueryExecutor;
use quarry::search::trec::write_trec_run;

fn corpus(docs: &[&str]) -> Arc<dyn IndexReader> {
    let mut index = MemoryIndex::with_analyzer(Analyzer::plain());
    for (i, body) in docs.iter().enumerate() {
        index
            .add_document(&format!("D{}", i + 1), &[("body", *body)])
            .unwrap();
    }
    Arc::new(index)
}

fn executor(index: Arc<dyn IndexReader>, model: RetrievalModel) -> QueryExecutor {
    QueryExecutor::new(
        index,
        QueryParser::new(Analyzer::plain()),
        SearchConfig { model, ..SearchConfig::default() },
    )
}

fn ids_and_scores(results: &quarry::search::results::ScoreList) -> Vec<(u32, f64)> {
    results.iter().map(|e| (e.doc_id.0, e.score)).collect()
}

#[test]
fn unranked_boolean_and_intersects() {
    let exec = executor(corpus(&["a b", "a c", "b c"]), RetrievalModel::UnrankedBoolean);
    let results = exec.search("#and( a b )").unwrap();
    assert_eq!(ids_and_scores(&results), vec![(0, 1.0)]);
}

#[test]
fn unranked_boolean_or_unions() {
    let exec = executor(corpus(&["a b", "a c", "b c"]), RetrievalModel::UnrankedBoolean);
    let results = exec.search("a b").unwrap();
    assert_eq!(
        ids_and_scores(&results),
        vec![(0, 1.0), (1, 1.0), (2, 1.0)]
    );
}

#[test]
fn ranked_boolean_ties_break_by_docid() {
    // both docs have min tf 1 across the two terms
    let exec = executor(corpus(&["a a b", "a b b b"]), RetrievalModel::RankedBoolean);
    let results = exec.search("a b").unwrap();
    assert_eq!(ids_and_scores(&results), vec![(0, 1.0), (1, 1.0)]);
}

#[test]
fn bm25_clamps_common_term_scores_to_zero() {
    // df(a) = 2 of N = 3 drives the idf negative, hence the clamp
    let exec = executor(
        corpus(&["a a", "a c", "b c"]),
        RetrievalModel::Bm25(Bm25Params::default()),
    );
    let results = exec.search("a").unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|e| e.score == 0.0));
}

#[test]
fn indri_scores_partial_matches_with_defaults() {
    let params = IndriParams { mu: 1000.0, lambda: 0.0 };
    let exec = executor(corpus(&["a b", "b c"]), RetrievalModel::Indri(params));

    // z matches nothing; the one doc containing a still comes back with
    // the geometric mean of a's score and z's default score
    let results = exec.search("#and( a z )").unwrap();
    let score_a: f64 = (1.0 + 1000.0 * (1.0 / 4.0)) / 1002.0;
    let default_z = (1000.0 * (0.5 / 4.0)) / 1002.0;
    let want = (score_a * default_z).sqrt();

    assert_eq!(results.len(), 1);
    assert_eq!(results.entries[0].doc_id.0, 0);
    assert!((results.entries[0].score - want).abs() < 1e-12);
}

#[test]
fn near_respects_the_distance_bound() {
    let index = corpus(&["the quick brown fox jumps"]);
    let exec = executor(Arc::clone(&index), RetrievalModel::UnrankedBoolean);

    assert_eq!(exec.search("#near/2( quick fox )").unwrap().len(), 1);
    assert_eq!(exec.search("#near/1( quick fox )").unwrap().len(), 0);
}

#[test]
fn window_is_insensitive_to_argument_order() {
    let index = corpus(&["a x b x x a b", "b a", "a x x x b"]);
    let exec = executor(Arc::clone(&index), RetrievalModel::UnrankedBoolean);

    let forward = exec.search("#window/3( a b )").unwrap();
    let reverse = exec.search("#window/3( b a )").unwrap();
    assert_eq!(ids_and_scores(&forward), ids_and_scores(&reverse));
    assert_eq!(forward.len(), 2);
}

#[test]
fn operators_nest_across_families() {
    let exec = executor(
        corpus(&["apple pie recipe", "apple tart recipe", "pear pie recipe"]),
        RetrievalModel::RankedBoolean,
    );
    let results = exec.search("#and( recipe #or( #near/1( apple pie ) tart ) )").unwrap();
    assert_eq!(
        ids_and_scores(&results),
        vec![(0, 1.0), (1, 1.0)]
    );
}

#[test]
fn trec_run_layout() {
    let index = corpus(&["a b", "a c"]);
    let exec = executor(Arc::clone(&index), RetrievalModel::UnrankedBoolean);
    let results = exec.search("a").unwrap();

    let mut out = Vec::new();
    write_trec_run(&mut out, "10", &results, &index, "run-1").unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "10 Q0 D1 1 1.000000000000 run-1");
    assert_eq!(lines[1], "10 Q0 D2 2 1.000000000000 run-1");

    let mut out = Vec::new();
    let empty = exec.search("zzz").unwrap();
    write_trec_run(&mut out, "11", &empty, &index, "run-1").unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "11 Q0 dummy 1 0 run-1\n");
}

#[test]
fn batch_failures_stay_contained() {
    let exec = executor(corpus(&["a b"]), RetrievalModel::UnrankedBoolean);
    let queries = vec![
        ("1".to_string(), "#near( a b )".to_string()),
        ("2".to_string(), "a".to_string()),
    ];
    let batch = exec.run_batch(&queries);

    assert_eq!(batch.len(), 2);
    assert!(batch[0].1.is_empty());
    assert_eq!(batch[1].1.len(), 1);
}

#[test]
fn config_json_drives_the_model() {
    let config = SearchConfig::from_json(
        r#"{ "model": { "name": "bm25", "k1": 0.9, "b": 0.4, "k3": 0.0 }, "output_length": 1 }"#,
    )
    .unwrap();
    let exec = QueryExecutor::new(
        corpus(&["a b", "a b c"]),
        QueryParser::new(Analyzer::plain()),
        config,
    );
    let results = exec.search("c").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.entries[0].doc_id.0, 1);
}

#[test]
fn feedback_rewrite_survives_a_full_round_trip() {
    let index = corpus(&["apple pie dessert", "dessert cake", "apple orchard"]);
    let model = RetrievalModel::Indri(IndriParams::default());
    let exec = executor(Arc::clone(&index), model);

    let expansion = ExpansionParams { num_docs: 2, num_terms: 4, ..ExpansionParams::default() };
    let rewritten = expansion.expand(&exec, "apple", &model).unwrap();
    assert!(rewritten.starts_with("#wand ( 0.5 #and ( apple ) 0.5 #wand ("));

    let results = exec.process_query(&rewritten, &model).unwrap();
    assert!(results.len() >= 2);
}

#[test]
fn diversification_reorders_toward_uncovered_intents() {
    let index = corpus(&[
        "jaguar car speed",
        "jaguar car engine",
        "jaguar cat jungle",
    ]);
    let exec = executor(Arc::clone(&index), RetrievalModel::UnrankedBoolean);

    let params = DiversifyParams { lambda: 0.5, ..DiversifyParams::default() };
    let ranking = exec.search("jaguar").unwrap();
    let intents = vec![exec.search("car").unwrap(), exec.search("cat").unwrap()];
    let out = params.diversify(&ranking, &intents).unwrap();

    let order: Vec<u32> = out.iter().map(|e| e.doc_id.0).collect();
    assert_eq!(order, [0, 2, 1]);
}

#[test]
fn letor_features_flow_into_svmrank_lines() {
    let mut index = MemoryIndex::with_analyzer(Analyzer::plain());
    let d1 = index
        .add_document("GX-1", &[("body", "a a b"), ("title", "a")])
        .unwrap();
    index.set_attribute(d1, "rawUrl", "http://x.example.com/a");
    index.add_document("GX-2", &[("body", "a c")]).unwrap();
    let index: Arc<dyn IndexReader> = Arc::new(index);

    let extractor = FeatureExtractor::new(Arc::clone(&index), Analyzer::plain());
    let terms = extractor.query_terms("a b");
    let rows = vec![
        extractor.extract(&terms, "GX-1").unwrap().unwrap(),
        extractor.extract(&terms, "GX-2").unwrap().unwrap(),
    ];
    let normalized = normalize_features(&rows, &extractor.features);

    let line = svmrank_line(1.0, "5", &normalized[0], &rows[0].external_id);
    assert!(line.starts_with("1 qid:5 1:"));
    assert!(line.ends_with("# GX-1"));
    // every enabled feature appears, normalized into [0, 1]
    assert_eq!(line.matches(':').count(), 1 + extractor.features.len());
    assert!(normalized
        .iter()
        .flat_map(|row| row.values())
        .all(|v| (0.0..=1.0).contains(v)));
}
