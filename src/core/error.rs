use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    MalformedQuery,
    UnsupportedOperator,
    NotFound,
    InvalidArgument,
    InvalidState,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    /// Structural query error raised while building the operator tree.
    pub fn malformed(context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::MalformedQuery,
            context: context.into(),
        }
    }

    /// Operator asked to do something its retrieval model has no rule for.
    /// The message names both sides of the pair.
    pub fn unsupported(what: &str, model: &str) -> Self {
        Error {
            kind: ErrorKind::UnsupportedOperator,
            context: format!("{} is not supported under the {} model", what, model),
        }
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::InvalidArgument,
            context: context.into(),
        }
    }

    pub fn invalid_state(context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::InvalidState,
            context: context.into(),
        }
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::NotFound,
            context: context.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
