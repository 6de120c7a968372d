use std::sync::Arc;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::posting::{InvList, Posting};
use crate::index::reader::IndexReader;
use crate::query::ast::{IopKind, QryIop};

impl QryIop {
    /// Depth-first: children first, then this node materializes its list.
    /// NEAR/WINDOW consume their children's cursors while evaluating; only
    /// the node's own list is iterated afterwards.
    pub fn initialize(&mut self, index: &Arc<dyn IndexReader>) -> Result<()> {
        match &mut self.kind {
            IopKind::Term { .. } => {}
            IopKind::Near { args, .. } | IopKind::Window { args, .. } => {
                for arg in args.iter_mut() {
                    arg.initialize(index)?;
                }
            }
        }
        self.evaluate(index)
    }

    fn evaluate(&mut self, index: &Arc<dyn IndexReader>) -> Result<()> {
        let list: Arc<InvList> = match &mut self.kind {
            IopKind::Term { term } => index
                .inverted_list(&self.field, term)?
                .unwrap_or_else(|| Arc::new(InvList::new(self.field.clone()))),
            IopKind::Near { distance, args } => Arc::new(eval_near(*distance, args, &self.field)),
            IopKind::Window { distance, args } => Arc::new(eval_window(*distance, args, &self.field)),
        };
        self.inv = Some(list);
        self.doc_cursor = 0;
        self.loc_cursor = 0;
        Ok(())
    }

    fn postings(&self) -> &[Posting] {
        self.inv.as_deref().map(|list| list.postings.as_slice()).unwrap_or(&[])
    }

    pub fn doc_iterator_has_match(&self) -> bool {
        self.doc_cursor < self.postings().len()
    }

    pub fn doc_iterator_get_match(&self) -> Option<DocId> {
        self.postings().get(self.doc_cursor).map(|p| p.doc_id)
    }

    /// The posting under the document cursor.
    pub(crate) fn match_posting(&self) -> Option<&Posting> {
        self.postings().get(self.doc_cursor)
    }

    pub fn doc_iterator_advance_past(&mut self, doc_id: DocId) {
        while let Some(d) = self.doc_iterator_get_match() {
            if d <= doc_id {
                self.doc_cursor += 1;
            } else {
                break;
            }
        }
        self.loc_cursor = 0;
    }

    pub fn doc_iterator_advance_to(&mut self, doc_id: DocId) {
        while let Some(d) = self.doc_iterator_get_match() {
            if d < doc_id {
                self.doc_cursor += 1;
            } else {
                break;
            }
        }
        self.loc_cursor = 0;
    }

    pub fn loc_iterator_has_match(&self) -> bool {
        self.match_posting().map_or(false, |p| self.loc_cursor < p.positions.len())
    }

    pub fn loc_iterator_get_match(&self) -> Option<u32> {
        self.match_posting().and_then(|p| p.positions.get(self.loc_cursor).copied())
    }

    pub fn loc_iterator_advance(&mut self) {
        self.loc_cursor += 1;
    }

    pub fn loc_iterator_advance_past(&mut self, loc: u32) {
        while let Some(l) = self.loc_iterator_get_match() {
            if l <= loc {
                self.loc_cursor += 1;
            } else {
                break;
            }
        }
    }

    /// Document frequency of the materialized list.
    pub fn df(&self) -> u32 {
        self.inv.as_deref().map_or(0, |list| list.df())
    }

    /// Collection term frequency of the materialized list.
    pub fn ctf(&self) -> u64 {
        self.inv.as_deref().map_or(0, |list| list.ctf())
    }

    pub fn inv_list(&self) -> Option<&InvList> {
        self.inv.as_deref()
    }
}

/// Ordered proximity. The first child anchors both the document walk and
/// the location walk; each successive child must appear after the previous
/// one within `distance`. The rightmost location of each match is recorded.
fn eval_near(distance: u32, args: &mut [QryIop], field: &str) -> InvList {
    let mut result = InvList::new(field);
    if args.len() < 2 {
        return result;
    }

    while let Some(doc_id) = args[0].doc_iterator_get_match() {
        if contains_doc(&mut args[1..], doc_id) {
            let mut positions: Vec<u32> = Vec::new();

            'walk: while let Some(anchor_loc) = args[0].loc_iterator_get_match() {
                let mut current = anchor_loc;
                let mut satisfied = true;
                for i in 1..args.len() {
                    args[i].loc_iterator_advance_past(current);
                    match args[i].loc_iterator_get_match() {
                        // a child ran out of locations; no later anchor can match
                        None => break 'walk,
                        Some(loc) => {
                            if loc - current > distance {
                                satisfied = false;
                                break;
                            }
                            current = loc;
                        }
                    }
                }
                if satisfied {
                    positions.push(current);
                    for arg in args.iter_mut() {
                        arg.loc_iterator_advance();
                    }
                } else {
                    args[0].loc_iterator_advance();
                }
            }

            if !positions.is_empty() {
                positions.sort_unstable();
                result.append_posting(doc_id, positions);
            }
        }
        args[0].doc_iterator_advance_past(doc_id);
    }
    result
}

/// Unordered proximity: every child inside a span strictly smaller than
/// `distance`. The maximum location of each match is recorded.
fn eval_window(distance: u32, args: &mut [QryIop], field: &str) -> InvList {
    let mut result = InvList::new(field);
    if args.len() < 2 {
        return result;
    }

    while let Some(doc_id) = args[0].doc_iterator_get_match() {
        if contains_doc(&mut args[1..], doc_id) {
            let mut positions: Vec<u32> = Vec::new();

            loop {
                let mut min_idx = 0usize;
                let mut min_loc = u32::MAX;
                let mut max_loc = 0u32;
                let mut exhausted = false;
                for (i, arg) in args.iter().enumerate() {
                    match arg.loc_iterator_get_match() {
                        None => {
                            exhausted = true;
                            break;
                        }
                        Some(loc) => {
                            if loc < min_loc {
                                min_loc = loc;
                                min_idx = i;
                            }
                            if loc > max_loc {
                                max_loc = loc;
                            }
                        }
                    }
                }
                if exhausted {
                    break;
                }

                if max_loc - min_loc < distance {
                    positions.push(max_loc);
                    for arg in args.iter_mut() {
                        arg.loc_iterator_advance();
                    }
                } else {
                    args[min_idx].loc_iterator_advance();
                }
            }

            if !positions.is_empty() {
                positions.sort_unstable();
                result.append_posting(doc_id, positions);
            }
        }
        args[0].doc_iterator_advance_past(doc_id);
    }
    result
}

/// True when every argument's doc iterator can be advanced to `doc_id`.
fn contains_doc(args: &mut [QryIop], doc_id: DocId) -> bool {
    for arg in args.iter_mut() {
        arg.doc_iterator_advance_to(doc_id);
        if arg.doc_iterator_get_match() != Some(doc_id) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::index::memory::MemoryIndex;

    fn reader(docs: &[&str]) -> Arc<dyn IndexReader> {
        let mut index = MemoryIndex::with_analyzer(Analyzer::plain());
        for (i, body) in docs.iter().enumerate() {
            index.add_document(&format!("D{}", i + 1), &[("body", body)]).unwrap();
        }
        Arc::new(index)
    }

    fn near(distance: u32, terms: &[&str]) -> QryIop {
        QryIop::near(distance, terms.iter().map(|t| QryIop::term(*t, "body")).collect())
    }

    fn window(distance: u32, terms: &[&str]) -> QryIop {
        QryIop::window(distance, terms.iter().map(|t| QryIop::term(*t, "body")).collect())
    }

    #[test]
    fn term_iteration_is_monotone() {
        let index = reader(&["a b", "c", "a", "b a"]);
        let mut term = QryIop::term("a", "body");
        term.initialize(&index).unwrap();

        let mut seen = Vec::new();
        while let Some(d) = term.doc_iterator_get_match() {
            seen.push(d.0);
            term.doc_iterator_advance_past(d);
        }
        assert_eq!(seen, [0, 2, 3]);
        assert!(!term.doc_iterator_has_match());
    }

    #[test]
    fn advance_to_stops_at_target() {
        let index = reader(&["a", "b", "a", "a"]);
        let mut term = QryIop::term("a", "body");
        term.initialize(&index).unwrap();

        term.doc_iterator_advance_to(DocId(2));
        assert_eq!(term.doc_iterator_get_match(), Some(DocId(2)));
        // advancing to an earlier doc never rewinds
        term.doc_iterator_advance_to(DocId(0));
        assert_eq!(term.doc_iterator_get_match(), Some(DocId(2)));
    }

    #[test]
    fn unknown_term_yields_empty_list() {
        let index = reader(&["a b c"]);
        let mut term = QryIop::term("zebra", "body");
        term.initialize(&index).unwrap();
        assert!(!term.doc_iterator_has_match());
        assert_eq!(term.df(), 0);
    }

    #[test]
    fn near_matches_within_distance() {
        // quick=[1], fox=[3]
        let index = reader(&["the quick brown fox jumps"]);
        let mut op = near(2, &["quick", "fox"]);
        op.initialize(&index).unwrap();

        let list = op.inv_list().unwrap();
        assert_eq!(list.df(), 1);
        assert_eq!(list.postings[0].positions, vec![3]);
    }

    #[test]
    fn near_rejects_beyond_distance() {
        let index = reader(&["the quick brown fox jumps"]);
        let mut op = near(1, &["quick", "fox"]);
        op.initialize(&index).unwrap();
        assert!(op.inv_list().unwrap().is_empty());
    }

    #[test]
    fn near_is_ordered() {
        let index = reader(&["fox quick"]);
        let mut op = near(5, &["quick", "fox"]);
        op.initialize(&index).unwrap();
        assert!(op.inv_list().unwrap().is_empty());
    }

    #[test]
    fn near_single_argument_is_empty() {
        let index = reader(&["a a a"]);
        let mut op = near(3, &["a"]);
        op.initialize(&index).unwrap();
        assert!(op.inv_list().unwrap().is_empty());
    }

    #[test]
    fn near_multiple_hits_in_one_doc() {
        // a=[0,3], b=[1,4]
        let index = reader(&["a b c a b"]);
        let mut op = near(1, &["a", "b"]);
        op.initialize(&index).unwrap();

        let list = op.inv_list().unwrap();
        assert_eq!(list.postings[0].positions, vec![1, 4]);
        assert_eq!(list.ctf(), 2);
    }

    #[test]
    fn near_skips_docs_missing_a_child() {
        let index = reader(&["a b", "a", "b", "a b"]);
        let mut op = near(1, &["a", "b"]);
        op.initialize(&index).unwrap();

        let list = op.inv_list().unwrap();
        let docs: Vec<u32> = list.postings.iter().map(|p| p.doc_id.0).collect();
        assert_eq!(docs, [0, 3]);
    }

    #[test]
    fn near_converges_once_distance_covers_positions() {
        // beyond the max position every ordered pair matches
        let index = reader(&["a x x b x a b"]);
        let mut tight = near(100, &["a", "b"]);
        tight.initialize(&index).unwrap();
        let mut loose = near(1000, &["a", "b"]);
        loose.initialize(&index).unwrap();

        assert_eq!(
            tight.inv_list().unwrap().postings,
            loose.inv_list().unwrap().postings
        );
    }

    #[test]
    fn near_three_arguments_chain() {
        // a=[0], b=[2], c=[3]: a->b distance 2, b->c distance 1
        let index = reader(&["a x b c"]);
        let mut yes = near(2, &["a", "b", "c"]);
        yes.initialize(&index).unwrap();
        assert_eq!(yes.inv_list().unwrap().postings[0].positions, vec![3]);

        let mut no = near(1, &["a", "b", "c"]);
        no.initialize(&index).unwrap();
        assert!(no.inv_list().unwrap().is_empty());
    }

    #[test]
    fn window_records_span_maxima() {
        // a=[0,5], b=[2,6]
        let index = reader(&["a x b x x a b"]);
        let mut op = window(3, &["a", "b"]);
        op.initialize(&index).unwrap();

        let list = op.inv_list().unwrap();
        assert_eq!(list.postings[0].positions, vec![2, 6]);
    }

    #[test]
    fn window_is_unordered() {
        let index = reader(&["a x b x x a b"]);
        let mut fwd = window(3, &["a", "b"]);
        fwd.initialize(&index).unwrap();
        let mut rev = window(3, &["b", "a"]);
        rev.initialize(&index).unwrap();

        let fwd_list = fwd.inv_list().unwrap();
        let rev_list = rev.inv_list().unwrap();
        let fwd_docs: Vec<u32> = fwd_list.postings.iter().map(|p| p.doc_id.0).collect();
        let rev_docs: Vec<u32> = rev_list.postings.iter().map(|p| p.doc_id.0).collect();
        assert_eq!(fwd_docs, rev_docs);
        assert_eq!(
            fwd_list.postings[0].positions.len(),
            rev_list.postings[0].positions.len()
        );
    }

    #[test]
    fn window_span_is_strict() {
        // span (max-min) must be < distance: b at 2, a at 0 -> span 2
        let index = reader(&["a x b"]);
        let mut at_span = window(2, &["a", "b"]);
        at_span.initialize(&index).unwrap();
        assert!(at_span.inv_list().unwrap().is_empty());

        let mut above_span = window(3, &["a", "b"]);
        above_span.initialize(&index).unwrap();
        assert_eq!(above_span.inv_list().unwrap().df(), 1);
    }

    #[test]
    fn window_three_arguments() {
        // a=[0], b=[1], c=[2]: span 2 < 3
        let index = reader(&["a b c"]);
        let mut op = window(3, &["a", "b", "c"]);
        op.initialize(&index).unwrap();
        assert_eq!(op.inv_list().unwrap().postings[0].positions, vec![2]);
    }

    #[test]
    fn nested_near_inside_window() {
        let index = reader(&["a b x x c"]);
        let inner = near(1, &["a", "b"]);
        let mut op = QryIop::window(5, vec![inner, QryIop::term("c", "body")]);
        op.initialize(&index).unwrap();

        // NEAR(a,b) hits at 1; window over [1,4] has span 3 < 5
        let list = op.inv_list().unwrap();
        assert_eq!(list.postings[0].positions, vec![4]);
    }

    #[test]
    fn derived_lists_have_ascending_postings() {
        let index = reader(&["a b", "x", "a a b b", "a b"]);
        let mut op = near(2, &["a", "b"]);
        op.initialize(&index).unwrap();

        let list = op.inv_list().unwrap();
        assert!(list.postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
        for posting in &list.postings {
            assert!(posting.positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
