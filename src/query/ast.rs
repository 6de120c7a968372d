use std::fmt;
use std::sync::Arc;

use crate::core::types::DocId;
use crate::index::posting::InvList;
use crate::index::reader::IndexReader;

/// Inverted-list-producing operator: a term lookup or a positional
/// combination of other IOPs. After `initialize` the node owns a
/// materialized `InvList` plus a document cursor and a location cursor,
/// both forward-only.
#[derive(Debug)]
pub struct QryIop {
    pub kind: IopKind,
    pub field: String,
    pub(crate) inv: Option<Arc<InvList>>,
    pub(crate) doc_cursor: usize,
    pub(crate) loc_cursor: usize,
}

#[derive(Debug)]
pub enum IopKind {
    Term { term: String },
    Near { distance: u32, args: Vec<QryIop> },
    Window { distance: u32, args: Vec<QryIop> },
}

impl QryIop {
    pub fn term(term: impl Into<String>, field: impl Into<String>) -> Self {
        QryIop {
            kind: IopKind::Term { term: term.into() },
            field: field.into(),
            inv: None,
            doc_cursor: 0,
            loc_cursor: 0,
        }
    }

    /// Ordered within-`distance` proximity. The produced list is tagged
    /// with the first child's field.
    pub fn near(distance: u32, args: Vec<QryIop>) -> Self {
        let field = args.first().map(|a| a.field.clone()).unwrap_or_else(|| "body".to_string());
        QryIop {
            kind: IopKind::Near { distance, args },
            field,
            inv: None,
            doc_cursor: 0,
            loc_cursor: 0,
        }
    }

    /// Unordered span-under-`distance` proximity.
    pub fn window(distance: u32, args: Vec<QryIop>) -> Self {
        let field = args.first().map(|a| a.field.clone()).unwrap_or_else(|| "body".to_string());
        QryIop {
            kind: IopKind::Window { distance, args },
            field,
            inv: None,
            doc_cursor: 0,
            loc_cursor: 0,
        }
    }
}

/// Score-producing operator. `match_cache` holds the candidate located by
/// the most recent `doc_iterator_has_match` call; advancing invalidates it.
#[derive(Debug)]
pub struct QrySop {
    pub kind: SopKind,
    pub(crate) match_cache: Option<DocId>,
}

#[derive(Debug)]
pub enum SopKind {
    Score { arg: QryIop, stats: Option<LeafStats> },
    And { args: Vec<QrySop> },
    Or { args: Vec<QrySop> },
    Sum { args: Vec<QrySop> },
    Wand { weights: Vec<f64>, args: Vec<QrySop> },
    Wsum { weights: Vec<f64>, args: Vec<QrySop> },
}

/// Collection statistics a SCORE leaf gathers at initialization so scoring
/// needs only the per-document field length lookup.
pub struct LeafStats {
    pub(crate) index: Arc<dyn IndexReader>,
    pub(crate) num_docs: f64,
    pub(crate) avg_doc_len: f64,
    pub(crate) sum_field_len: f64,
}

// Manual impl: `dyn IndexReader` carries no `Debug` bound, so the index
// handle is elided from the output.
impl fmt::Debug for LeafStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LeafStats")
            .field("num_docs", &self.num_docs)
            .field("avg_doc_len", &self.avg_doc_len)
            .field("sum_field_len", &self.sum_field_len)
            .finish_non_exhaustive()
    }
}

impl QrySop {
    pub fn score(arg: QryIop) -> Self {
        QrySop {
            kind: SopKind::Score { arg, stats: None },
            match_cache: None,
        }
    }

    pub fn and(args: Vec<QrySop>) -> Self {
        QrySop { kind: SopKind::And { args }, match_cache: None }
    }

    pub fn or(args: Vec<QrySop>) -> Self {
        QrySop { kind: SopKind::Or { args }, match_cache: None }
    }

    pub fn sum(args: Vec<QrySop>) -> Self {
        QrySop { kind: SopKind::Sum { args }, match_cache: None }
    }

    /// Weighted AND; weights pair with args positionally.
    pub fn wand(weights: Vec<f64>, args: Vec<QrySop>) -> Self {
        debug_assert_eq!(weights.len(), args.len());
        QrySop { kind: SopKind::Wand { weights, args }, match_cache: None }
    }

    /// Weighted SUM; weights pair with args positionally.
    pub fn wsum(weights: Vec<f64>, args: Vec<QrySop>) -> Self {
        debug_assert_eq!(weights.len(), args.len());
        QrySop { kind: SopKind::Wsum { weights, args }, match_cache: None }
    }

    pub fn arg_count(&self) -> usize {
        match &self.kind {
            SopKind::Score { .. } => 1,
            SopKind::And { args }
            | SopKind::Or { args }
            | SopKind::Sum { args }
            | SopKind::Wand { args, .. }
            | SopKind::Wsum { args, .. } => args.len(),
        }
    }
}

impl fmt::Display for QryIop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            IopKind::Term { term } => {
                if self.field == "body" {
                    write!(f, "{}", term)
                } else {
                    write!(f, "{}.{}", term, self.field)
                }
            }
            IopKind::Near { distance, args } => {
                write!(f, "#NEAR/{}(", distance)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            IopKind::Window { distance, args } => {
                write!(f, "#WINDOW/{}(", distance)?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_args<T: fmt::Display>(f: &mut fmt::Formatter, args: &[T]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

fn write_weighted_args(f: &mut fmt::Formatter, weights: &[f64], args: &[QrySop]) -> fmt::Result {
    for (i, (weight, arg)) in weights.iter().zip(args).enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{} {}", weight, arg)?;
    }
    Ok(())
}

impl fmt::Display for QrySop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            // SCORE is implicit in the written form
            SopKind::Score { arg, .. } => write!(f, "{}", arg),
            SopKind::And { args } => {
                write!(f, "#AND(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            SopKind::Or { args } => {
                write!(f, "#OR(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            SopKind::Sum { args } => {
                write!(f, "#SUM(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            SopKind::Wand { weights, args } => {
                write!(f, "#WAND(")?;
                write_weighted_args(f, weights, args)?;
                write!(f, ")")
            }
            SopKind::Wsum { weights, args } => {
                write!(f, "#WSUM(")?;
                write_weighted_args(f, weights, args)?;
                write!(f, ")")
            }
        }
    }
}
