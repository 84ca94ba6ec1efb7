//! Errors generated when lexing templates.
use std::fmt;

use crate::{
    error::{ErrorInfo, SourcePos},
    lexer::token::Token,
};

static LEXER_PREFIX: &str = "Lexing failed";

/// The specific failure detected by the lexer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LexerErrorKind {
    /// Catch-all for grammar violations that have no dedicated variant.
    Unknown(String),
    /// A character that cannot begin any parameter token.
    InvalidParameterToken(char),
    /// A character sequence that does not form a known operator, or an
    /// operator used with whitespace it does not permit.
    InvalidOperator(String),
    /// A string literal interrupted by a newline or the end of input.
    UnterminatedStringLiteral,
    /// End of input while a parameter list was still open.
    OpenParameters,
    /// End of input while a comment was still open.
    OpenComment,
}

impl LexerErrorKind {
    fn message(&self) -> String {
        match *self {
            Self::Unknown(ref msg) => msg.clone(),
            Self::InvalidParameterToken(c) => {
                format!("invalid character '{}' in parameters", c)
            }
            Self::InvalidOperator(ref op) => {
                format!("invalid operator '{}'", op)
            }
            Self::UnterminatedStringLiteral => {
                "unterminated string literal".to_string()
            }
            Self::OpenParameters => {
                "parameters not terminated before end of input".to_string()
            }
            Self::OpenComment => {
                "comment not terminated before end of input".to_string()
            }
        }
    }
}

/// Error produced while lexing a template.
///
/// Carries the position of the offending character and the tokens
/// produced so far; both exist for diagnostics.
#[derive(Clone, PartialEq)]
pub struct LexerError {
    kind: LexerErrorKind,
    name: String,
    pos: SourcePos,
    line_text: String,
    tokens: Vec<Token>,
}

impl LexerError {
    /// Create a new lexer error.
    pub fn new(
        kind: LexerErrorKind,
        name: &str,
        pos: SourcePos,
        line_text: String,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            kind,
            name: name.to_string(),
            pos,
            line_text,
            tokens,
        }
    }

    /// The failure kind.
    pub fn kind(&self) -> &LexerErrorKind {
        &self.kind
    }

    /// Position of the offending character.
    pub fn position(&self) -> &SourcePos {
        &self.pos
    }

    /// The tokens lexed before the failure.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} ({}:{})",
            LEXER_PREFIX,
            self.kind.message(),
            self.name,
            self.pos
        )
    }
}

impl fmt::Debug for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}\n", self)?;
        let info =
            ErrorInfo::new(self.line_text.clone(), &self.name, self.pos);
        write!(f, "{:?}", info)
    }
}

impl std::error::Error for LexerError {}
