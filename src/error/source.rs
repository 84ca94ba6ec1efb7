//! Errors raised by template sources and utilities for
//! generating error messages with source code.
use std::fmt;
use unicode_width::UnicodeWidthStr;

use crate::error::IoError;

/// Errors raised when reading template bytes from a source.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SourceError {
    /// The source has no template for the requested path.
    #[error("No template for '{0}'")]
    NotFound(String),
    /// The path escapes the source or is otherwise malformed.
    #[error("Illegal template path '{0}'")]
    IllegalPath(String),
    /// Underlying read failure.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Io(err))
    }
}

/// Map a position for lexer errors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SourcePos {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column index in characters.
    pub column: usize,
    /// Character offset from the start of the template.
    pub offset: usize,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Information needed to generate a source code snippet.
#[derive(Clone, Eq, PartialEq)]
pub struct ErrorInfo {
    line_text: String,
    file_name: String,
    source_pos: SourcePos,
}

impl ErrorInfo {
    /// Create a new error info.
    pub fn new(line_text: String, file_name: &str, source_pos: SourcePos) -> Self {
        Self {
            line_text,
            file_name: file_name.to_string(),
            source_pos,
        }
    }

    /// The position the snippet points at.
    pub fn position(&self) -> &SourcePos {
        &self.source_pos
    }
}

impl fmt::Debug for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = &self.source_pos;
        let line_number = pos.line + 1;

        let line_prefix = format!(" {} | ", line_number);
        let line_padding = " ".repeat(line_prefix.len() - 3);

        let column = pos.column.min(self.line_text.chars().count());
        let caret_slice: String =
            self.line_text.chars().take(column).collect();
        let cols = UnicodeWidthStr::width(&caret_slice[..]);

        let file_info =
            format!("{}:{}:{}", self.file_name, line_number, cols + 1);

        let err_pointer = format!("{}^", "-".repeat(cols));

        write!(f, "{}--> {}\n", line_padding, file_info)?;
        write!(f, "{} |\n", line_padding)?;
        write!(f, "{}{}\n", line_prefix, self.line_text)?;
        write!(f, "{} | {}", line_padding, err_pointer)?;

        Ok(())
    }
}

impl From<ErrorInfo> for String {
    fn from(info: ErrorInfo) -> Self {
        format!("{:?}", info)
    }
}
