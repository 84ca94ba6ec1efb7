//! Errors generated when parsing token streams.
use thiserror::Error;

/// Errors raised while assembling the node tree for a template.
///
/// Every variant names the template the parser was working on so
/// failures deep in an inline resolution stay attributable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token stream ended mid-construct.
    #[error("Unexpected end of tokens in template '{0}'")]
    UnexpectedEof(String),
    /// A token that cannot appear at the current position.
    #[error("Unexpected {1} in template '{0}'")]
    UnexpectedToken(String, String),
    /// A block body was never closed.
    #[error("Block '{1}' is not closed in template '{0}'")]
    UnclosedBlock(String, String),
    /// A closing tag appeared with no matching open block.
    #[error("Closing tag '{1}' has no open block in template '{0}'")]
    BlockNotOpen(String, String),
    /// A chained continuation appeared after the chain terminated.
    #[error("Chained block '{1}' cannot follow a terminal branch in template '{0}'")]
    ChainTerminated(String, String),
    /// Loop signatures must read `binding in collection`.
    #[error("Malformed loop signature in template '{0}': {1}")]
    LoopSignature(String, String),
    /// Inline directives take a single string literal.
    #[error("Inline directive in template '{0}' requires a single string literal")]
    InlineName(String),
    /// The block is registered for lexing but the parser has no
    /// semantics for it.
    #[error("Block '{1}' is not supported by this parser in template '{0}'")]
    UnsupportedBlock(String, String),
}
