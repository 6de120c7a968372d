use serde::{Serialize, Deserialize};

/// One analyzed token. Positions index into the original token stream, so
/// filters that drop tokens leave gaps rather than renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

impl Token {
    pub fn new(text: String, position: u32) -> Self {
        Token { text, position }
    }
}
