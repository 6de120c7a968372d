use rust_stemmers::Algorithm;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};

/// Text analysis pipeline. Index text and query text must run through the
/// same analyzer or their terms will not line up.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        self.analyze_counted(text).0
    }

    /// Analyze and also report how many positions the tokenizer emitted.
    /// Field lengths count every position, including those of tokens a
    /// filter later dropped.
    pub fn analyze_counted(&self, text: &str) -> (Vec<Token>, u32) {
        let mut tokens = self.tokenizer.tokenize(text);
        let total_positions = tokens.len() as u32;

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        (tokens, total_positions)
    }

    /// Lowercase, stopword removal, Snowball English stemming.
    pub fn standard_english() -> Self {
        Analyzer::new("standard_english".to_string(), Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }

    /// Lowercase only. Useful when exact surface terms matter.
    pub fn plain() -> Self {
        Analyzer::new("plain".to_string(), Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }
}

impl Clone for Analyzer {
    fn clone(&self) -> Self {
        Analyzer {
            tokenizer: self.tokenizer.clone_box(),
            filters: self.filters.iter().map(|f| f.clone_box()).collect(),
            name: self.name.clone(),
        }
    }
}
