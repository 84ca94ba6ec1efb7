//! Character cursor over a named template source.
use crate::error::SourcePos;

/// A cursor over the characters of one template.
///
/// Lives for the duration of a single lex call. Reaching the end of
/// input is signalled with `None`, never an error.
#[derive(Debug)]
pub struct RawTemplate {
    name: String,
    chars: Vec<char>,
    offset: usize,
    line: usize,
    column: usize,
}

impl RawTemplate {
    /// Create a cursor over `source` for the template `name`.
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            chars: source.chars().collect(),
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    /// Name of the template being lexed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current position, used for diagnostics.
    pub fn position(&self) -> SourcePos {
        SourcePos {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    /// The next character, without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    /// The character `ahead` positions past the next one,
    /// without consuming anything.
    pub fn peek_ahead(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.offset + ahead).copied()
    }

    /// Consume and return the next character.
    pub fn pop(&mut self) -> Option<char> {
        let c = self.chars.get(self.offset).copied()?;
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume and return the run of characters matching `pred`.
    pub fn read_while<P>(&mut self, pred: P) -> String
    where
        P: Fn(char) -> bool,
    {
        let mut run = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            run.push(c);
            self.pop();
        }
        run
    }

    /// Consume and return the run of characters up to (not including)
    /// any character in `stops`.
    pub fn read_while_not(&mut self, stops: &[char]) -> String {
        self.read_while(|c| !stops.contains(&c))
    }

    /// Return the run of characters matching `pred` without
    /// consuming anything.
    pub fn peek_while<P>(&self, pred: P) -> String
    where
        P: Fn(char) -> bool,
    {
        self.chars[self.offset..]
            .iter()
            .take_while(|c| pred(**c))
            .collect()
    }

    /// Text of the line the cursor is currently on, for diagnostics.
    pub fn line_text(&self) -> String {
        let at = self.offset.min(self.chars.len());
        let start = self.chars[..at]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let end = self.chars[at..]
            .iter()
            .position(|&c| c == '\n')
            .map(|i| at + i)
            .unwrap_or(self.chars.len());
        self.chars[start..end].iter().collect()
    }
}
