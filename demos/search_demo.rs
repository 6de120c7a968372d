/// Example: structured retrieval over an in-memory index
///
/// This walks the whole pipeline: indexing, boolean and ranked retrieval,
/// positional operators, ranked-run output, feedback and diversification.

use quarry::core::config::SearchConfig;
use quarry::diversify::{DiversifyParams, DiversityAlgorithm};
use quarry::feedback::ExpansionParams;
use quarry::index::memory::MemoryIndex;
use quarry::query::parser::QueryParser;
use quarry::scoring::model::{Bm25Params, IndriParams, RetrievalModel};
use quarry::search::executor::QueryExecutor;
use quarry::search::trec::write_trec_run;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. Index a small corpus. Analysis lowercases, drops stopwords and
    //    stems, so "Jaguars" and "jaguar" meet in the same posting list.
    let mut index = MemoryIndex::new();
    let corpus = [
        ("WEB-001", "The jaguar is a large cat native to the Americas", "Jaguar habitat"),
        ("WEB-002", "Jaguar builds luxury cars and sport sedans in England", "Jaguar cars"),
        ("WEB-003", "The jaguar hunts along rivers in the rainforest", "Rainforest cats"),
        ("WEB-004", "Classic Jaguar sports cars are prized by collectors", "Classic cars"),
        ("WEB-005", "Big cats such as the jaguar and leopard climb well", "Big cats"),
    ];
    for (id, body, title) in corpus {
        index.add_document(id, &[("body", body), ("title", title)])?;
    }
    let index: Arc<dyn quarry::index::reader::IndexReader> = Arc::new(index);
    println!("✓ Indexed {} documents", corpus.len());

    // 2. Boolean retrieval: unranked sets, ranked by tf
    let executor = QueryExecutor::new(
        Arc::clone(&index),
        QueryParser::default(),
        SearchConfig::default(),
    );
    let results = executor.process_query("#and( jaguar cats )", &RetrievalModel::UnrankedBoolean)?;
    println!("\n#and( jaguar cats ) matches {} documents", results.len());

    // 3. BM25 ranking with a field-restricted term
    let mut config = SearchConfig::default();
    config.model = RetrievalModel::Bm25(Bm25Params::default());
    let executor = QueryExecutor::new(Arc::clone(&index), QueryParser::default(), config);
    let results = executor.search("jaguar cars.title")?;
    println!("\nBM25 ranking for 'jaguar cars.title':");
    for (rank, entry) in results.iter().enumerate() {
        println!(
            "  {}. {}  {:.4}",
            rank + 1,
            index.external_docid(entry.doc_id)?,
            entry.score
        );
    }

    // 4. Positional retrieval: terms must appear in order within 3 positions
    let results = executor.process_query("#near/3( jaguar cars )", &RetrievalModel::UnrankedBoolean)?;
    println!("\n#near/3( jaguar cars ) matches {} documents", results.len());

    // 5. Ranked-run output in trec_eval format
    let mut run = Vec::new();
    let ranking = executor.search("sports cars")?;
    write_trec_run(&mut run, "701", &ranking, &index, "demo")?;
    println!("\ntrec_eval run:\n{}", String::from_utf8(run)?);

    // 6. Indri with pseudo-relevance feedback: the query is rewritten with
    //    terms mined from the top-ranked documents
    let mut config = SearchConfig::default();
    config.model = RetrievalModel::Indri(IndriParams::default());
    config.expansion = Some(ExpansionParams { num_docs: 3, num_terms: 5, ..ExpansionParams::default() });
    let executor = QueryExecutor::new(Arc::clone(&index), QueryParser::default(), config);

    let expansion = ExpansionParams { num_docs: 3, num_terms: 5, ..ExpansionParams::default() };
    let rewritten = expansion.expand(&executor, "jaguar", &executor.config.model)?;
    println!("expanded query: {}", rewritten);
    let results = executor.search("jaguar")?;
    println!("✓ Feedback retrieval returned {} documents", results.len());

    // 7. Diversify across the animal and car senses of the query
    let mut config = SearchConfig::default();
    config.diversity = Some(DiversifyParams {
        algorithm: DiversityAlgorithm::Pm2,
        lambda: 0.7,
        ..DiversifyParams::default()
    });
    let executor = QueryExecutor::new(Arc::clone(&index), QueryParser::default(), config);
    let results = executor.search_diversified("jaguar", &["jaguar cat", "jaguar cars"])?;
    println!("\nPM-2 diversified ranking for 'jaguar':");
    for (rank, entry) in results.iter().enumerate() {
        println!(
            "  {}. {}  {:.4}",
            rank + 1,
            index.external_docid(entry.doc_id)?,
            entry.score
        );
    }

    Ok(())
}
