use std::fmt::{self, Display, Formatter};

/// The category of failure reported in a [ParseError]. There is deliberately no
/// `Ok` variant here — unlike the status-code this crate's grammar was distilled
/// from, success is expressed by `Result::Ok`, not by a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TokenizerError,
    StateMismatchError,
    UnexpectedTokenError,
    InvalidNumberError,
    UnknownKeyError,
    TypeMismatchError,
    Unsupported,
    InvalidState,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A parse-time failure: what went wrong, a human-readable detail, and the byte
/// offset into the source text where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ErrorKind, message: String, position: usize) -> Self {
        Self {
            kind,
            message,
            position,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.kind, self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A schema-construction failure: raised while a [crate::ClassMapping] is being
/// built, never while a document is being read. Mirrors author mistakes
/// (duplicate field keys) rather than malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationError {
    what: String,
    message: String,
}

impl ImplementationError {
    pub fn new(what: String, message: String) -> Self {
        Self { what, message }
    }
}

impl Display for ImplementationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ImplementationError: {}-{}", self.what, self.message)
    }
}

impl std::error::Error for ImplementationError {}
