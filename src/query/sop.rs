use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::reader::IndexReader;
use crate::query::ast::{LeafStats, QryIop, QrySop, SopKind};
use crate::scoring::model::RetrievalModel;

impl QrySop {
    /// Top-down initialization. SCORE leaves gather the field statistics
    /// their model needs so scoring never touches corpus-wide lookups.
    pub fn initialize(&mut self, index: &Arc<dyn IndexReader>, model: &RetrievalModel) -> Result<()> {
        match &mut self.kind {
            SopKind::Score { arg, stats } => {
                arg.initialize(index)?;
                let doc_count = index.doc_count(&arg.field)? as f64;
                let sum_field_len = index.sum_of_field_lengths(&arg.field)? as f64;
                *stats = Some(LeafStats {
                    index: Arc::clone(index),
                    num_docs: index.num_docs()? as f64,
                    avg_doc_len: if doc_count > 0.0 { sum_field_len / doc_count } else { 0.0 },
                    sum_field_len,
                });
            }
            SopKind::And { args }
            | SopKind::Or { args }
            | SopKind::Sum { args }
            | SopKind::Wand { args, .. }
            | SopKind::Wsum { args, .. } => {
                for arg in args.iter_mut() {
                    arg.initialize(index, model)?;
                }
            }
        }
        self.match_cache = None;
        Ok(())
    }

    /// Locates the next candidate document and caches it. The mode depends
    /// on the operator and model: OR always takes the minimum child docid;
    /// AND, SUM, WAND and WSUM do the same under the best-match models but
    /// require full agreement under the Boolean models; SCORE mirrors its
    /// single child.
    pub fn doc_iterator_has_match(&mut self, model: &RetrievalModel) -> bool {
        self.match_cache = match &mut self.kind {
            SopKind::Score { arg, .. } => arg.doc_iterator_get_match(),
            SopKind::Or { args } => doc_match_min(args, model),
            SopKind::And { args }
            | SopKind::Sum { args }
            | SopKind::Wand { args, .. }
            | SopKind::Wsum { args, .. } => match model {
                RetrievalModel::Bm25(_) | RetrievalModel::Indri(_) => doc_match_min(args, model),
                RetrievalModel::UnrankedBoolean | RetrievalModel::RankedBoolean => {
                    doc_match_all(args, model)
                }
            },
        };
        self.match_cache.is_some()
    }

    pub fn doc_iterator_get_match(&self) -> Option<DocId> {
        self.match_cache
    }

    pub fn doc_iterator_advance_past(&mut self, doc_id: DocId) {
        match &mut self.kind {
            SopKind::Score { arg, .. } => arg.doc_iterator_advance_past(doc_id),
            SopKind::And { args }
            | SopKind::Or { args }
            | SopKind::Sum { args }
            | SopKind::Wand { args, .. }
            | SopKind::Wsum { args, .. } => {
                for arg in args.iter_mut() {
                    arg.doc_iterator_advance_past(doc_id);
                }
            }
        }
        self.match_cache = None;
    }

    pub fn doc_iterator_advance_to(&mut self, doc_id: DocId) {
        match &mut self.kind {
            SopKind::Score { arg, .. } => arg.doc_iterator_advance_to(doc_id),
            SopKind::And { args }
            | SopKind::Or { args }
            | SopKind::Sum { args }
            | SopKind::Wand { args, .. }
            | SopKind::Wsum { args, .. } => {
                for arg in args.iter_mut() {
                    arg.doc_iterator_advance_to(doc_id);
                }
            }
        }
        self.match_cache = None;
    }

    /// Score of the cached match. Valid only after `doc_iterator_has_match`
    /// returned true; children's caches are fresh from the same call.
    pub fn get_score(&self, model: &RetrievalModel) -> Result<f64> {
        let doc_id = self
            .match_cache
            .ok_or_else(|| Error::invalid_state("get_score called with no current match"))?;
        match &self.kind {
            SopKind::Score { arg, stats } => score_leaf(arg, stats, doc_id, model),
            SopKind::And { args } => score_and(args, doc_id, model),
            SopKind::Or { args } => score_or(args, doc_id, model),
            SopKind::Sum { args } => score_sum(args, doc_id, model),
            SopKind::Wand { weights, args } => score_wand(weights, args, doc_id, model),
            SopKind::Wsum { weights, args } => score_wsum(weights, args, doc_id, model),
        }
    }

    /// Score for a document this subtree does not match. Only the Indri
    /// model defines one; the algebra is the same as `get_score` with every
    /// child's default substituted, bottoming out at SCORE leaves with
    /// tf = 0. SUM has no Indri scoring rule and contributes 0.
    pub fn get_default_score(&self, model: &RetrievalModel, doc_id: DocId) -> Result<f64> {
        let params = match model {
            RetrievalModel::Indri(params) => params,
            _ => return Err(Error::unsupported("default scores", model.name())),
        };
        match &self.kind {
            SopKind::Score { arg, stats } => {
                let stats = leaf_stats(stats)?;
                let doc_len = stats.index.field_length(&arg.field, doc_id)? as f64;
                Ok(params.default_term_score(arg.ctf() as f64, doc_len, stats.sum_field_len))
            }
            SopKind::And { args } => {
                let exponent = 1.0 / args.len() as f64;
                let mut product = 1.0;
                for arg in args {
                    product *= arg.get_default_score(model, doc_id)?.powf(exponent);
                }
                Ok(product)
            }
            SopKind::Or { args } => {
                let mut all_miss = 1.0;
                for arg in args {
                    all_miss *= 1.0 - arg.get_default_score(model, doc_id)?;
                }
                Ok(1.0 - all_miss)
            }
            SopKind::Sum { .. } => Ok(0.0),
            SopKind::Wand { weights, args } => {
                let mut product = 1.0;
                for (weight, arg) in weights.iter().zip(args) {
                    product *= arg.get_default_score(model, doc_id)?.powf(*weight);
                }
                Ok(product)
            }
            SopKind::Wsum { weights, args } => {
                let mut total = 0.0;
                for (weight, arg) in weights.iter().zip(args) {
                    total += weight * arg.get_default_score(model, doc_id)?;
                }
                Ok(total)
            }
        }
    }
}

/// Minimum docid among children that still have one. Exhausted children
/// are skipped, not fatal.
fn doc_match_min(args: &mut [QrySop], model: &RetrievalModel) -> Option<DocId> {
    let mut min: Option<DocId> = None;
    for arg in args.iter_mut() {
        if arg.doc_iterator_has_match(model) {
            match (min, arg.doc_iterator_get_match()) {
                (None, d) => min = d,
                (Some(m), Some(d)) if d < m => min = Some(d),
                _ => {}
            }
        }
    }
    min
}

/// Docid every child agrees on: repeatedly advance laggards to the current
/// maximum until all align or one exhausts.
fn doc_match_all(args: &mut [QrySop], model: &RetrievalModel) -> Option<DocId> {
    loop {
        let mut target: Option<DocId> = None;
        let mut aligned = true;
        for arg in args.iter_mut() {
            if !arg.doc_iterator_has_match(model) {
                return None;
            }
            let d = arg.doc_iterator_get_match()?;
            match target {
                None => target = Some(d),
                Some(t) if d != t => {
                    aligned = false;
                    if d > t {
                        target = Some(d);
                    }
                }
                Some(_) => {}
            }
        }
        let target = target?;
        if aligned {
            return Some(target);
        }
        for arg in args.iter_mut() {
            arg.doc_iterator_advance_to(target);
        }
    }
}

/// A child's score when it matches `doc_id`, its default score otherwise.
fn effective_score(arg: &QrySop, doc_id: DocId, model: &RetrievalModel) -> Result<f64> {
    if arg.doc_iterator_get_match() == Some(doc_id) {
        arg.get_score(model)
    } else {
        arg.get_default_score(model, doc_id)
    }
}

fn leaf_stats(stats: &Option<LeafStats>) -> Result<&LeafStats> {
    stats
        .as_ref()
        .ok_or_else(|| Error::invalid_state("score leaf used before initialize"))
}

fn score_leaf(
    arg: &QryIop,
    stats: &Option<LeafStats>,
    doc_id: DocId,
    model: &RetrievalModel,
) -> Result<f64> {
    let posting = arg
        .match_posting()
        .ok_or_else(|| Error::invalid_state("score leaf has no current posting"))?;
    debug_assert_eq!(posting.doc_id, doc_id);
    let tf = posting.tf() as f64;
    match model {
        RetrievalModel::UnrankedBoolean => Ok(1.0),
        RetrievalModel::RankedBoolean => Ok(tf),
        RetrievalModel::Bm25(params) => {
            let stats = leaf_stats(stats)?;
            let doc_len = stats.index.field_length(&arg.field, doc_id)? as f64;
            Ok(params.term_score(tf, arg.df() as f64, stats.num_docs, doc_len, stats.avg_doc_len))
        }
        RetrievalModel::Indri(params) => {
            let stats = leaf_stats(stats)?;
            let doc_len = stats.index.field_length(&arg.field, doc_id)? as f64;
            Ok(params.term_score(tf, arg.ctf() as f64, doc_len, stats.sum_field_len))
        }
    }
}

fn score_and(args: &[QrySop], doc_id: DocId, model: &RetrievalModel) -> Result<f64> {
    match model {
        RetrievalModel::UnrankedBoolean => Ok(1.0),
        RetrievalModel::RankedBoolean => {
            let mut min = f64::INFINITY;
            for arg in args {
                min = min.min(arg.get_score(model)?);
            }
            Ok(min)
        }
        RetrievalModel::Indri(_) => {
            let exponent = 1.0 / args.len() as f64;
            let mut product = 1.0;
            for arg in args {
                product *= effective_score(arg, doc_id, model)?.powf(exponent);
            }
            Ok(product)
        }
        RetrievalModel::Bm25(_) => Err(Error::unsupported("#AND scoring", model.name())),
    }
}

fn score_or(args: &[QrySop], doc_id: DocId, model: &RetrievalModel) -> Result<f64> {
    match model {
        RetrievalModel::UnrankedBoolean => Ok(1.0),
        RetrievalModel::RankedBoolean => {
            let mut best: Option<f64> = None;
            for arg in args {
                if arg.doc_iterator_get_match() == Some(doc_id) {
                    let score = arg.get_score(model)?;
                    best = Some(best.map_or(score, |b: f64| b.max(score)));
                }
            }
            best.ok_or_else(|| Error::invalid_state("no child matches the current document"))
        }
        RetrievalModel::Indri(_) => {
            let mut all_miss = 1.0;
            for arg in args {
                all_miss *= 1.0 - effective_score(arg, doc_id, model)?;
            }
            Ok(1.0 - all_miss)
        }
        RetrievalModel::Bm25(_) => Err(Error::unsupported("#OR scoring", model.name())),
    }
}

fn score_sum(args: &[QrySop], doc_id: DocId, model: &RetrievalModel) -> Result<f64> {
    match model {
        RetrievalModel::Bm25(_) => {
            let mut total = 0.0;
            for arg in args {
                if arg.doc_iterator_get_match() == Some(doc_id) {
                    total += arg.get_score(model)?;
                }
            }
            Ok(total)
        }
        _ => Err(Error::unsupported("#SUM scoring", model.name())),
    }
}

fn score_wand(weights: &[f64], args: &[QrySop], doc_id: DocId, model: &RetrievalModel) -> Result<f64> {
    match model {
        RetrievalModel::Indri(_) => {
            let mut product = 1.0;
            for (weight, arg) in weights.iter().zip(args) {
                product *= effective_score(arg, doc_id, model)?.powf(*weight);
            }
            Ok(product)
        }
        _ => Err(Error::unsupported("#WAND scoring", model.name())),
    }
}

fn score_wsum(weights: &[f64], args: &[QrySop], doc_id: DocId, model: &RetrievalModel) -> Result<f64> {
    match model {
        RetrievalModel::Indri(_) => {
            let mut total = 0.0;
            for (weight, arg) in weights.iter().zip(args) {
                total += weight * effective_score(arg, doc_id, model)?;
            }
            Ok(total)
        }
        _ => Err(Error::unsupported("#WSUM scoring", model.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::error::ErrorKind;
    use crate::index::memory::MemoryIndex;
    use crate::scoring::model::{Bm25Params, IndriParams};

    fn reader(docs: &[&str]) -> Arc<dyn IndexReader> {
        let mut index = MemoryIndex::with_analyzer(Analyzer::plain());
        for (i, body) in docs.iter().enumerate() {
            index.add_document(&format!("D{}", i + 1), &[("body", body)]).unwrap();
        }
        Arc::new(index)
    }

    fn leaf(term: &str) -> QrySop {
        QrySop::score(QryIop::term(term, "body"))
    }

    fn drive(root: &mut QrySop, model: &RetrievalModel) -> Vec<(u32, f64)> {
        let mut out = Vec::new();
        while root.doc_iterator_has_match(model) {
            let Some(doc_id) = root.doc_iterator_get_match() else { break };
            out.push((doc_id.0, root.get_score(model).unwrap()));
            root.doc_iterator_advance_past(doc_id);
        }
        out
    }

    #[test]
    fn unranked_and_is_strict_intersection() {
        let index = reader(&["a b", "a c", "b c"]);
        let model = RetrievalModel::UnrankedBoolean;
        let mut root = QrySop::and(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert_eq!(drive(&mut root, &model), vec![(0, 1.0)]);
    }

    #[test]
    fn unranked_or_is_union() {
        let index = reader(&["a b", "a c", "b c", "x"]);
        let model = RetrievalModel::UnrankedBoolean;
        let mut root = QrySop::or(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert_eq!(drive(&mut root, &model), vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn ranked_and_takes_minimum_tf() {
        let index = reader(&["a a a b b", "a b"]);
        let model = RetrievalModel::RankedBoolean;
        let mut root = QrySop::and(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert_eq!(drive(&mut root, &model), vec![(0, 2.0), (1, 1.0)]);
    }

    #[test]
    fn ranked_or_takes_maximum_over_matching() {
        let index = reader(&["a a b", "b b b"]);
        let model = RetrievalModel::RankedBoolean;
        let mut root = QrySop::or(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        // doc 0 matches both (max of 2, 1); doc 1 matches b alone
        assert_eq!(drive(&mut root, &model), vec![(0, 2.0), (1, 3.0)]);
    }

    #[test]
    fn bm25_sum_adds_matching_children() {
        // a: df=1, c: df=2, N=4, avg body length 1.5
        let index = reader(&["a b", "b", "b c", "c"]);
        let model = RetrievalModel::Bm25(Bm25Params::default());
        let mut root = QrySop::sum(vec![leaf("a"), leaf("c")]);
        root.initialize(&index, &model).unwrap();

        let results = drive(&mut root, &model);
        assert_eq!(results.len(), 3);

        let idf_a = (3.5_f64 / 1.5).ln();
        let tf_w = 1.0 / (1.0 + 1.2 * (0.25 + 0.75 * 2.0 / 1.5));
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - idf_a * tf_w).abs() < 1e-12);

        // c appears in half the collection, idf = ln(1) = 0
        assert_eq!(results[1], (2, 0.0));
        assert_eq!(results[2], (3, 0.0));
    }

    #[test]
    fn bm25_common_terms_clamp_to_zero() {
        // both terms in 2 of 3 docs, idf clamps at zero
        let index = reader(&["a b", "a c", "b c"]);
        let model = RetrievalModel::Bm25(Bm25Params::default());
        let mut root = QrySop::sum(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        for (_, score) in drive(&mut root, &model) {
            assert_eq!(score, 0.0);
        }
    }

    #[test]
    fn indri_and_blends_default_scores() {
        // z occurs nowhere; docs with a still match, with z defaulted
        let index = reader(&["a b", "b c"]);
        let model = RetrievalModel::Indri(IndriParams { mu: 1000.0, lambda: 0.0 });
        let mut root = QrySop::and(vec![leaf("a"), leaf("z")]);
        root.initialize(&index, &model).unwrap();

        let results = drive(&mut root, &model);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 0);

        // |C| = 4, dl = 2; a: tf=1 ctf=1; z: ctf -> 0.5
        let score_a: f64 = (1.0 + 1000.0 * (1.0 / 4.0)) / (2.0 + 1000.0);
        let default_z: f64 = (0.0 + 1000.0 * (0.5 / 4.0)) / (2.0 + 1000.0);
        let want = score_a.powf(0.5) * default_z.powf(0.5);
        assert!((results[0].1 - want).abs() < 1e-12, "got {}", results[0].1);
    }

    #[test]
    fn indri_or_combines_miss_probabilities() {
        let index = reader(&["a b", "c d"]);
        let model = RetrievalModel::Indri(IndriParams::default());
        let mut root = QrySop::or(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert!(root.doc_iterator_has_match(&model));
        let got = root.get_score(&model).unwrap();

        let params = IndriParams::default();
        let s_a = params.term_score(1.0, 1.0, 2.0, 4.0);
        let s_b = params.term_score(1.0, 1.0, 2.0, 4.0);
        let want = 1.0 - (1.0 - s_a) * (1.0 - s_b);
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn indri_wand_raises_to_raw_weights() {
        let index = reader(&["a b"]);
        let model = RetrievalModel::Indri(IndriParams::default());
        let mut root = QrySop::wand(vec![0.7, 0.3], vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert!(root.doc_iterator_has_match(&model));
        let got = root.get_score(&model).unwrap();

        let params = IndriParams::default();
        let s = params.term_score(1.0, 1.0, 2.0, 2.0);
        let want = s.powf(0.7) * s.powf(0.3);
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn indri_wsum_is_weighted_average() {
        let index = reader(&["a a b"]);
        let model = RetrievalModel::Indri(IndriParams::default());
        let mut root = QrySop::wsum(vec![0.7, 0.3], vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert!(root.doc_iterator_has_match(&model));
        let got = root.get_score(&model).unwrap();

        let params = IndriParams::default();
        let s_a = params.term_score(2.0, 2.0, 3.0, 3.0);
        let s_b = params.term_score(1.0, 1.0, 3.0, 3.0);
        let want = 0.7 * s_a + 0.3 * s_b;
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn nested_operators_compose() {
        let index = reader(&["a b c", "a c"]);
        let model = RetrievalModel::RankedBoolean;
        let inner = QrySop::and(vec![leaf("a"), leaf("b")]);
        let mut root = QrySop::or(vec![inner, leaf("c")]);
        root.initialize(&index, &model).unwrap();

        // doc 0: max(min(1,1), 1) = 1; doc 1: c alone
        assert_eq!(drive(&mut root, &model), vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn bm25_boolean_composition_is_rejected() {
        let index = reader(&["a b"]);
        let model = RetrievalModel::Bm25(Bm25Params::default());
        let mut root = QrySop::and(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert!(root.doc_iterator_has_match(&model));
        let err = root.get_score(&model).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperator);
    }

    #[test]
    fn sum_outside_bm25_is_rejected() {
        let index = reader(&["a b"]);
        let model = RetrievalModel::RankedBoolean;
        let mut root = QrySop::sum(vec![leaf("a"), leaf("b")]);
        root.initialize(&index, &model).unwrap();

        assert!(root.doc_iterator_has_match(&model));
        let err = root.get_score(&model).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperator);
    }

    #[test]
    fn default_score_requires_indri() {
        let index = reader(&["a b"]);
        let model = RetrievalModel::Bm25(Bm25Params::default());
        let mut root = leaf("a");
        root.initialize(&index, &model).unwrap();

        let err = root.get_default_score(&model, DocId(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperator);
    }

    #[test]
    fn score_without_match_is_an_error() {
        let index = reader(&["a"]);
        let model = RetrievalModel::UnrankedBoolean;
        let mut root = leaf("z");
        root.initialize(&index, &model).unwrap();

        assert!(!root.doc_iterator_has_match(&model));
        let err = root.get_score(&model).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[test]
    fn sum_default_score_is_zero() {
        let index = reader(&["a b"]);
        let model = RetrievalModel::Indri(IndriParams::default());
        let mut root = QrySop::sum(vec![leaf("a")]);
        root.initialize(&index, &model).unwrap();

        assert_eq!(root.get_default_score(&model, DocId(0)).unwrap(), 0.0);
    }

    #[test]
    fn advance_past_clears_the_cached_match() {
        let index = reader(&["a", "a"]);
        let model = RetrievalModel::UnrankedBoolean;
        let mut root = leaf("a");
        root.initialize(&index, &model).unwrap();

        assert!(root.doc_iterator_has_match(&model));
        root.doc_iterator_advance_past(DocId(0));
        assert_eq!(root.doc_iterator_get_match(), None);
        assert!(root.doc_iterator_has_match(&model));
        assert_eq!(root.doc_iterator_get_match(), Some(DocId(1)));
    }
}
