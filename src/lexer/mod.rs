//! Lex template sources into token streams.
//!
//! The lexer is a state machine over a [RawTemplate] character
//! cursor. Classification of tag names depends on the entities
//! registered at runtime, so tokenization cannot be described by a
//! static grammar; unknown tags decay back into raw text.
use std::collections::HashSet;

use crate::{
    entity::Entities,
    error::{LexerError, LexerErrorKind},
};

pub mod raw;
pub mod token;

pub use raw::RawTemplate;
pub use token::{Keyword, Literal, Operator, ParamToken, Token};

/// Whether `c` may begin an identifier.
pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Whether `c` may continue an identifier.
pub(crate) fn is_identifier_continue(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// Whether `s` is a well formed identifier.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return false,
    }
    chars.all(is_identifier_continue)
}

fn is_numeric_start(c: char) -> bool {
    c.is_ascii_digit()
}

// Digits, separators, radix prefixes and hex digits; the numeric
// reader takes the maximal run and sorts out validity afterwards.
fn is_numeric_continue(c: char) -> bool {
    c.is_ascii_digit()
        || matches!(c, '_' | '.' | 'o' | 'x' | 'a'..='f' | 'A'..='F')
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Raw,
    Tag,
    Parameters,
    Body,
}

/// Lex `source` with the given entities, returning the token stream.
pub fn collect(
    name: &str,
    source: &str,
    entities: &Entities,
) -> Result<Vec<Token>, LexerError> {
    Lexer::new(RawTemplate::new(name, source), entities).lex()
}

/// Token stream producer for a single template.
pub struct Lexer {
    template: RawTemplate,
    openers: HashSet<String>,
    closers: HashSet<String>,
    indicator: char,
    state: State,
    depth: usize,
    buffer: String,
    tokens: Vec<Token>,
    pending_whitespace: bool,
}

impl Lexer {
    /// Create a lexer over `template` driven by the entity registry.
    pub fn new(template: RawTemplate, entities: &Entities) -> Self {
        Self {
            template,
            openers: entities.openers(),
            closers: entities.closers(),
            indicator: entities.tag_indicator(),
            state: State::Raw,
            depth: 0,
            buffer: String::new(),
            tokens: Vec::new(),
            pending_whitespace: false,
        }
    }

    /// Consume the template and produce its tokens.
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while self.template.peek().is_some() {
            match self.state {
                State::Raw => self.raw()?,
                State::Tag => self.tag()?,
                State::Parameters => self.parameters()?,
                State::Body => self.body()?,
            }
        }
        match self.state {
            State::Raw => {
                self.flush_raw();
                Ok(self.tokens)
            }
            State::Parameters | State::Body => {
                Err(self.fail(LexerErrorKind::OpenParameters))
            }
            State::Tag => Err(self.fail(LexerErrorKind::Unknown(
                "tag not completed before end of input".to_string(),
            ))),
        }
    }

    fn fail(&self, kind: LexerErrorKind) -> LexerError {
        LexerError::new(
            kind,
            self.template.name(),
            self.template.position(),
            self.template.line_text(),
            self.tokens.clone(),
        )
    }

    fn flush_raw(&mut self) {
        if !self.buffer.is_empty() {
            let text = std::mem::take(&mut self.buffer);
            self.tokens.push(Token::Raw(text));
        }
    }

    fn raw(&mut self) -> Result<(), LexerError> {
        let stops = [self.indicator, '\\'];
        let chunk = self.template.read_while_not(&stops);
        self.buffer.push_str(&chunk);

        let c = match self.template.peek() {
            Some(c) => c,
            None => return Ok(()),
        };

        if c == '\\' {
            self.template.pop();
            match self.template.peek() {
                // an escaped backslash, possibly ahead of a live tag
                Some('\\') => {
                    self.template.pop();
                    self.buffer.push('\\');
                }
                Some(next) if next == self.indicator => {
                    self.template.pop();
                    self.buffer.push(self.indicator);
                }
                _ => self.buffer.push('\\'),
            }
            return Ok(());
        }

        // tag indicator; only live when an invocation can follow
        match self.template.peek_ahead(1) {
            Some(next) if is_identifier_start(next) || next == '(' => {
                self.flush_raw();
                self.template.pop();
                self.tokens.push(Token::TagMark);
                self.state = State::Tag;
            }
            _ => {
                self.template.pop();
                self.buffer.push(c);
            }
        }
        Ok(())
    }

    fn tag(&mut self) -> Result<(), LexerError> {
        match self.template.peek() {
            Some(c) if is_identifier_start(c) => {
                let id = self.template.read_while(is_identifier_continue);
                self.classify_tag(id)
            }
            Some('(') => {
                self.tokens.push(Token::Tag(None));
                self.enter_parameters();
                Ok(())
            }
            _ => {
                self.decay_tag_mark();
                Ok(())
            }
        }
    }

    // Rewrite the TagMark just emitted back into literal text.
    fn decay_tag_mark(&mut self) {
        if let Some(last) = self.tokens.last_mut() {
            if *last == Token::TagMark {
                *last = Token::Raw(self.indicator.to_string());
            }
        }
        self.state = State::Raw;
    }

    fn enter_parameters(&mut self) {
        self.depth = 0;
        self.pending_whitespace = false;
        self.state = State::Parameters;
    }

    fn classify_tag(&mut self, id: String) -> Result<(), LexerError> {
        let is_opener = self.openers.contains(&id);
        let is_closer = self.closers.contains(&id);

        if !is_opener && !is_closer {
            self.decay_tag_mark();
            self.tokens.push(Token::Raw(id));
            return Ok(());
        }

        let has_params = self.template.peek() == Some('(');
        match (has_params, is_closer) {
            (true, true) => Err(self.fail(LexerErrorKind::Unknown(format!(
                "closing tag '{}' cannot have parameters",
                id
            )))),
            (false, false) => Err(self.fail(LexerErrorKind::Unknown(
                format!(
                    "tag '{}' must be called with parameters, even empty ones",
                    id
                ),
            ))),
            (true, false) => {
                self.tokens.push(Token::Tag(Some(id)));
                self.enter_parameters();
                Ok(())
            }
            (false, true) if is_opener => {
                // a chained terminal like `else` closes the previous
                // body and must open its own immediately
                if self.template.peek() == Some(':') {
                    self.tokens.push(Token::Tag(Some(id)));
                    self.template.pop();
                    self.tokens.push(Token::BlockMark);
                    self.state = State::Raw;
                    Ok(())
                } else {
                    Err(self.fail(LexerErrorKind::Unknown(format!(
                        "chained block '{}' must open a body with ':'",
                        id
                    ))))
                }
            }
            (false, true) => {
                self.tokens.push(Token::Tag(Some(id)));
                self.state = State::Raw;
                Ok(())
            }
        }
    }

    fn parameters(&mut self) -> Result<(), LexerError> {
        let preceded_by_whitespace = self.pending_whitespace;
        self.pending_whitespace = false;

        let c = match self.template.pop() {
            Some(c) => c,
            None => return Err(self.fail(LexerErrorKind::OpenParameters)),
        };

        if c.is_whitespace() {
            let mut run = String::from(c);
            run.push_str(&self.template.read_while(char::is_whitespace));
            // retained only where the parser needs it to split a
            // subscript from a trailing collection
            if self.template.peek() == Some('[') {
                self.tokens.push(Token::Whitespace(run));
            }
            self.pending_whitespace = true;
            return Ok(());
        }

        if c == self.indicator {
            // comment, runs to the next indicator
            self.template.read_while_not(&[self.indicator]);
            if self.template.pop().is_none() {
                return Err(self.fail(LexerErrorKind::OpenComment));
            }
            return Ok(());
        }

        match c {
            '(' => {
                self.depth += 1;
                self.tokens.push(Token::ParamsStart);
                Ok(())
            }
            ')' => {
                self.tokens.push(Token::ParamsEnd);
                if self.depth > 1 {
                    self.depth -= 1;
                } else {
                    self.depth = 0;
                    self.state = if self.template.peek() == Some(':') {
                        State::Body
                    } else {
                        State::Raw
                    };
                }
                Ok(())
            }
            ',' => {
                self.tokens.push(Token::ParamDelimit);
                Ok(())
            }
            ':' => self.label_mark(),
            '"' => self.string_literal(),
            '[' => self.subscript_or_literal(preceded_by_whitespace),
            '_' if self.template.peek().map_or(false, char::is_whitespace) => {
                self.tokens
                    .push(Token::Param(ParamToken::Keyword(Keyword::Discard)));
                Ok(())
            }
            _ if Operator::is_operator_char(c) => {
                self.operator(c, preceded_by_whitespace)
            }
            _ if is_numeric_start(c) => self.numeric(c),
            _ if is_identifier_start(c) => self.identifier(c),
            _ => Err(self.fail(LexerErrorKind::InvalidParameterToken(c))),
        }
    }

    // A `:` is a label when exactly one parameter token separates it
    // from the opening `(`, `,` or subscript `[`.
    fn label_mark(&mut self) -> Result<(), LexerError> {
        let n = self.tokens.len();
        let prior = n.checked_sub(2).and_then(|i| self.tokens.get(i));
        let labeled = matches!(
            prior,
            Some(Token::ParamsStart)
                | Some(Token::ParamDelimit)
                | Some(Token::Param(ParamToken::Operator(Operator::SubOpen)))
        ) && matches!(self.tokens.last(), Some(Token::Param(_)));
        if labeled {
            self.tokens.push(Token::LabelMark);
            Ok(())
        } else {
            Err(self.fail(LexerErrorKind::InvalidParameterToken(':')))
        }
    }

    fn string_literal(&mut self) -> Result<(), LexerError> {
        let value = self.template.read_while_not(&['"', '\n']);
        match self.template.peek() {
            Some('"') => {
                self.template.pop();
                self.tokens
                    .push(Token::Param(ParamToken::Literal(Literal::Str(value))));
                Ok(())
            }
            _ => Err(self.fail(LexerErrorKind::UnterminatedStringLiteral)),
        }
    }

    fn subscript_or_literal(
        &mut self,
        preceded_by_whitespace: bool,
    ) -> Result<(), LexerError> {
        match self.template.peek() {
            Some(']') => {
                self.template.pop();
                self.tokens.push(Token::Param(ParamToken::Literal(
                    Literal::EmptyArray,
                )));
                Ok(())
            }
            Some(':') => {
                if self.template.peek_ahead(1) == Some(']') {
                    self.template.pop();
                    self.template.pop();
                    self.tokens.push(Token::Param(ParamToken::Literal(
                        Literal::EmptyDict,
                    )));
                    Ok(())
                } else {
                    self.template.pop();
                    Err(self.fail(LexerErrorKind::InvalidParameterToken(':')))
                }
            }
            _ => self.operator('[', preceded_by_whitespace),
        }
    }

    fn operator(
        &mut self,
        first: char,
        preceded_by_whitespace: bool,
    ) -> Result<(), LexerError> {
        let op = match self
            .template
            .peek()
            .and_then(|next| Operator::from_pair(first, next))
        {
            Some(op) => {
                self.template.pop();
                op
            }
            None => match Operator::from_single(first) {
                Some(op) => op,
                None => {
                    return Err(self.fail(LexerErrorKind::InvalidOperator(
                        first.to_string(),
                    )))
                }
            },
        };

        if !op.allows_adjacent_whitespace() {
            let followed =
                self.template.peek().map_or(false, char::is_whitespace);
            if preceded_by_whitespace || followed {
                return Err(self.fail(LexerErrorKind::InvalidOperator(
                    op.as_str().to_string(),
                )));
            }
        }

        self.tokens.push(Token::Param(ParamToken::Operator(op)));
        Ok(())
    }

    fn numeric(&mut self, first: char) -> Result<(), LexerError> {
        let mut run = String::from(first);
        run.push_str(&self.template.peek_while(is_numeric_continue));
        let remainder = run.chars().count() - 1;
        let stripped: String = run.chars().filter(|&c| c != '_').collect();

        let radix = if stripped.len() > 2 {
            match &stripped[..2] {
                "0b" => Some(2),
                "0o" => Some(8),
                "0x" => Some(16),
                _ => None,
            }
        } else {
            None
        };

        let mut literal = if let Some(radix) = radix {
            match i64::from_str_radix(&stripped[2..], radix) {
                Ok(value) => Literal::Int(value),
                Err(_) => {
                    return Err(self.fail(LexerErrorKind::Unknown(format!(
                        "invalid numeric literal '{}'",
                        run
                    ))))
                }
            }
        } else if matches!(stripped.as_str(), "0b" | "0o" | "0x") {
            // a bare radix prefix is not a numeric; the identifier
            // attempt it decays to rejects the leading digit
            return Err(self.fail(LexerErrorKind::InvalidParameterToken(first)));
        } else if stripped.contains('.') {
            match stripped.parse::<f64>() {
                Ok(value) => Literal::Double(value),
                Err(_) => {
                    return Err(self.fail(LexerErrorKind::Unknown(format!(
                        "invalid numeric literal '{}'",
                        run
                    ))))
                }
            }
        } else {
            match stripped.parse::<i64>() {
                Ok(value) => Literal::Int(value),
                Err(_) => {
                    return Err(self.fail(LexerErrorKind::Unknown(format!(
                        "invalid numeric literal '{}'",
                        run
                    ))))
                }
            }
        };

        // an immediately preceding minus is unary unless a value
        // came before it; unary signs join the literal
        if let Some(Token::Param(ParamToken::Operator(Operator::Minus))) =
            self.tokens.last()
        {
            let n = self.tokens.len();
            let binary = match n.checked_sub(2).and_then(|i| self.tokens.get(i))
            {
                Some(Token::Param(ParamToken::Literal(_)))
                | Some(Token::Param(ParamToken::Function(_)))
                | Some(Token::Param(ParamToken::Variable(_))) => true,
                Some(Token::Param(ParamToken::Keyword(keyword))) => {
                    return Err(self.fail(LexerErrorKind::Unknown(format!(
                        "keyword '{}' cannot precede a signed number",
                        keyword
                    ))));
                }
                _ => false,
            };
            if !binary {
                self.tokens.pop();
                literal = match literal {
                    Literal::Int(value) => Literal::Int(-value),
                    Literal::Double(value) => Literal::Double(-value),
                    other => other,
                };
            }
        }

        self.tokens
            .push(Token::Param(ParamToken::Literal(literal)));
        for _ in 0..remainder {
            self.template.pop();
        }
        Ok(())
    }

    fn identifier(&mut self, first: char) -> Result<(), LexerError> {
        let mut id = String::from(first);
        id.push_str(&self.template.read_while(is_identifier_continue));
        if let Some(keyword) = Keyword::parse(&id) {
            self.tokens
                .push(Token::Param(ParamToken::Keyword(keyword)));
        } else if self.template.peek() == Some('(') {
            self.tokens.push(Token::Param(ParamToken::Function(id)));
        } else {
            self.tokens.push(Token::Param(ParamToken::Variable(id)));
        }
        Ok(())
    }

    fn body(&mut self) -> Result<(), LexerError> {
        self.template.pop();
        self.tokens.push(Token::BlockMark);
        self.state = State::Raw;
        Ok(())
    }
}
