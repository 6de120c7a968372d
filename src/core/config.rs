use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use crate::core::error::Result;
use crate::diversify::DiversifyParams;
use crate::feedback::ExpansionParams;
use crate::scoring::model::RetrievalModel;

/// Runtime knobs for query evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_field: String,   // field used when a term carries no .field suffix
    pub output_length: usize,    // results kept after sorting
    pub run_id: String,          // tag written into ranked-run output
    pub model: RetrievalModel,
    /// Pseudo-relevance feedback applied before the final retrieval;
    /// None turns it off.
    pub expansion: Option<ExpansionParams>,
    /// Diversified re-ranking parameters; None turns it off.
    pub diversity: Option<DiversifyParams>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_field: "body".to_string(),
            output_length: 100,
            run_id: "quarry".to_string(),
            model: RetrievalModel::default(),
            expansion: None,
            diversity: None,
        }
    }
}

impl SearchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
