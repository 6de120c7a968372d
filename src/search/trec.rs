use std::io::Write;
use std::sync::Arc;

use crate::core::error::Result;
use crate::index::reader::IndexReader;
use crate::search::results::ScoreList;

/// Write one query's ranking in trec_eval input format:
/// `QueryID Q0 DocID Rank Score RunID`, one line per document. An empty
/// ranking still produces a line so downstream evaluation sees the query.
pub fn write_trec_run<W: Write>(
    out: &mut W,
    query_id: &str,
    results: &ScoreList,
    index: &Arc<dyn IndexReader>,
    run_id: &str,
) -> Result<()> {
    if results.is_empty() {
        writeln!(out, "{} Q0 dummy 1 0 {}", query_id, run_id)?;
        return Ok(());
    }
    for (rank, entry) in results.iter().enumerate() {
        let external = index.external_docid(entry.doc_id)?;
        writeln!(
            out,
            "{} Q0 {} {} {:.12} {}",
            query_id,
            external,
            rank + 1,
            entry.score,
            run_id
        )?;
    }
    Ok(())
}
