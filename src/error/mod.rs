//! Error types.
use std::fmt;

pub mod cache;
pub mod lexer;
pub mod parse;
pub mod render;
pub mod source;

pub use cache::CacheError;
pub use lexer::{LexerError, LexerErrorKind};
pub use parse::ParseError;
pub use render::{Chain, RenderError};
pub use source::{ErrorInfo, SourceError, SourcePos};

/// Generic error type that wraps more specific types and is
/// returned when using the `Renderer`.
pub enum Error {
    /// Error produced while lexing a template.
    Lexer(LexerError),
    /// Error produced while parsing a token stream.
    Parse(ParseError),
    /// Error produced while orchestrating or serializing a render.
    Render(RenderError),
    /// Error produced by the document cache.
    Cache(CacheError),
    /// Error produced reading from a template source.
    Source(SourceError),
    /// Input/output error.
    Io(IoError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Lexer(ref e) => fmt::Display::fmt(e, f),
            Self::Parse(ref e) => fmt::Display::fmt(e, f),
            Self::Render(ref e) => fmt::Display::fmt(e, f),
            Self::Cache(ref e) => fmt::Display::fmt(e, f),
            Self::Source(ref e) => fmt::Display::fmt(e, f),
            Self::Io(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Lexer(ref e) => fmt::Debug::fmt(e, f),
            Self::Parse(ref e) => fmt::Debug::fmt(e, f),
            Self::Render(ref e) => fmt::Debug::fmt(e, f),
            Self::Cache(ref e) => fmt::Debug::fmt(e, f),
            Self::Source(ref e) => fmt::Debug::fmt(e, f),
            Self::Io(ref e) => fmt::Debug::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Io(err))
    }
}

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Self {
        Self::Lexer(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Self::Cache(err)
    }
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        Self::Source(err)
    }
}

/// Wrapper for IO errors that implements `PartialEq` to
/// facilitate easier testing using `assert_eq!()`.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// The wrapped error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Io(ref s), Self::Io(ref o)) => s.kind() == o.kind(),
        }
    }
}

impl Eq for IoError {}
