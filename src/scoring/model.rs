use serde::{Serialize, Deserialize};

use crate::core::error::{Error, Result};

/// Okapi BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,  // term frequency saturation
    pub b: f64,   // length normalization strength
    pub k3: f64,  // query term frequency saturation
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params {
            k1: 1.2,
            b: 0.75,
            k3: 0.0,
        }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if self.k1 < 0.0 {
            return Err(Error::invalid_argument(format!("bm25 k1 must be >= 0.0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::invalid_argument(format!("bm25 b must be in [0.0, 1.0], got {}", self.b)));
        }
        if self.k3 < 0.0 {
            return Err(Error::invalid_argument(format!("bm25 k3 must be >= 0.0, got {}", self.k3)));
        }
        Ok(())
    }

    /// Contribution of one query term occurrence to one document.
    ///
    /// The RSJ idf is clamped at zero so terms appearing in more than half
    /// the collection cannot push a score negative. Query term frequency is
    /// fixed at 1, which collapses the user weight (k3+1)*qtf/(k3+qtf) to 1
    /// for every k3.
    pub fn term_score(&self, tf: f64, df: f64, num_docs: f64, doc_len: f64, avg_doc_len: f64) -> f64 {
        let idf = ((num_docs - df + 0.5) / (df + 0.5)).ln().max(0.0);
        let tf_weight = tf / (tf + self.k1 * ((1.0 - self.b) + self.b * doc_len / avg_doc_len));
        idf * tf_weight
    }
}

/// Indri query-likelihood parameters: Dirichlet prior mu blended with
/// collection probability by lambda (two-level smoothing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndriParams {
    pub mu: f64,
    pub lambda: f64,
}

impl Default for IndriParams {
    fn default() -> Self {
        IndriParams {
            mu: 2500.0,
            lambda: 0.4,
        }
    }
}

impl IndriParams {
    pub fn validate(&self) -> Result<()> {
        if self.mu < 0.0 {
            return Err(Error::invalid_argument(format!("indri mu must be >= 0.0, got {}", self.mu)));
        }
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(Error::invalid_argument(format!(
                "indri lambda must be in [0.0, 1.0], got {}",
                self.lambda
            )));
        }
        Ok(())
    }

    /// Smoothed likelihood of one term in one document. A ctf of zero is
    /// replaced by 0.5 so unseen terms keep nonzero collection mass.
    pub fn term_score(&self, tf: f64, ctf: f64, doc_len: f64, collection_len: f64) -> f64 {
        let ctf = if ctf == 0.0 { 0.5 } else { ctf };
        let p_mle = ctf / collection_len;
        if doc_len == 0.0 && self.mu == 0.0 {
            return self.lambda * p_mle;
        }
        (1.0 - self.lambda) * (tf + self.mu * p_mle) / (doc_len + self.mu) + self.lambda * p_mle
    }

    /// Score substituted when a document matched elsewhere in the tree but
    /// not this term: the smoothed likelihood with tf = 0.
    pub fn default_term_score(&self, ctf: f64, doc_len: f64, collection_len: f64) -> f64 {
        self.term_score(0.0, ctf, doc_len, collection_len)
    }
}

/// The retrieval model driving match modes and leaf/compositional scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum RetrievalModel {
    UnrankedBoolean,
    RankedBoolean,
    Bm25(Bm25Params),
    Indri(IndriParams),
}

impl Default for RetrievalModel {
    fn default() -> Self {
        RetrievalModel::Bm25(Bm25Params::default())
    }
}

impl RetrievalModel {
    pub fn name(&self) -> &'static str {
        match self {
            RetrievalModel::UnrankedBoolean => "unrankedboolean",
            RetrievalModel::RankedBoolean => "rankedboolean",
            RetrievalModel::Bm25(_) => "bm25",
            RetrievalModel::Indri(_) => "indri",
        }
    }

    /// Operator wrapped around a raw query string before parsing.
    pub fn default_operator(&self) -> &'static str {
        match self {
            RetrievalModel::UnrankedBoolean => "#or",
            RetrievalModel::RankedBoolean => "#and",
            RetrievalModel::Bm25(_) => "#sum",
            RetrievalModel::Indri(_) => "#and",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            RetrievalModel::UnrankedBoolean | RetrievalModel::RankedBoolean => Ok(()),
            RetrievalModel::Bm25(params) => params.validate(),
            RetrievalModel::Indri(params) => params.validate(),
        }
    }
}

impl std::fmt::Display for RetrievalModel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
