//! Parse token streams into compiled templates.
//!
//! The parser walks the lexer's token vector once, assembling block
//! bodies recursively. Chained continuations (`elseif`, `else`) fold
//! into the conditional they continue; inline directives are recorded
//! on the produced document so the renderer knows what to resolve.
use crate::{
    ast::{Ast, AstKey},
    entity::Entities,
    error::ParseError,
    lexer::token::{Keyword, Literal, ParamToken, Token},
};

pub mod expression;
pub mod node;

pub use expression::{Argument, Expression};
pub use node::{Branch, Node};

use expression::{describe, ExpressionParser};

/// Consumes tokens, emits a compiled template.
pub struct Parser<'entities> {
    key: AstKey,
    name: String,
    entities: &'entities Entities,
    tokens: Vec<Token>,
    offset: usize,
}

impl<'entities> Parser<'entities> {
    /// Create a parser for the template identified by `key`.
    pub fn new(
        key: AstKey,
        tokens: Vec<Token>,
        entities: &'entities Entities,
    ) -> Self {
        let name = key.name();
        Self {
            key,
            name,
            entities,
            tokens,
            offset: 0,
        }
    }

    /// Parse the token stream into a compiled template.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let (tree, _) = self.nodes(&[])?;
        Ok(Ast::new(self.key, tree))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.offset)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.offset).cloned();
        if token.is_some() {
            self.offset += 1;
        }
        token
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        ParseError::UnexpectedToken(self.name.clone(), describe(token))
    }

    // Collect nodes until end of input or a tag named in
    // `terminators`; the terminator tag itself is consumed and
    // returned so the caller can finish the construct.
    fn nodes(
        &mut self,
        terminators: &[&str],
    ) -> Result<(Vec<Node>, Option<String>), ParseError> {
        let mut nodes = Vec::new();
        loop {
            let token = match self.next_token() {
                Some(token) => token,
                None => return Ok((nodes, None)),
            };
            match token {
                Token::Raw(text) => nodes.push(Node::Raw(text)),
                Token::TagMark => match self.next_token() {
                    Some(Token::Tag(None)) => {
                        nodes.push(self.expression_tag()?)
                    }
                    Some(Token::Tag(Some(name))) => {
                        if terminators.contains(&name.as_str()) {
                            return Ok((nodes, Some(name)));
                        }
                        nodes.push(self.named_tag(name)?);
                    }
                    Some(other) => return Err(self.unexpected(&other)),
                    None => {
                        return Err(ParseError::UnexpectedEof(
                            self.name.clone(),
                        ))
                    }
                },
                other => return Err(self.unexpected(&other)),
            }
        }
    }

    // Collect the tokens between the opening parenthesis and its
    // matching close, exclusive.
    fn params(&mut self) -> Result<Vec<Token>, ParseError> {
        match self.next_token() {
            Some(Token::ParamsStart) => {}
            Some(other) => return Err(self.unexpected(&other)),
            None => return Err(ParseError::UnexpectedEof(self.name.clone())),
        }
        let mut depth = 1usize;
        let mut params = Vec::new();
        loop {
            match self.next_token() {
                Some(Token::ParamsStart) => {
                    depth += 1;
                    params.push(Token::ParamsStart);
                }
                Some(Token::ParamsEnd) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(params);
                    }
                    params.push(Token::ParamsEnd);
                }
                Some(token) => params.push(token),
                None => {
                    return Err(ParseError::UnexpectedEof(self.name.clone()))
                }
            }
        }
    }

    fn expect_block_mark(&mut self) -> Result<(), ParseError> {
        match self.next_token() {
            Some(Token::BlockMark) => Ok(()),
            Some(other) => Err(self.unexpected(&other)),
            None => Err(ParseError::UnexpectedEof(self.name.clone())),
        }
    }

    fn reject_block_mark(&self) -> Result<(), ParseError> {
        if matches!(self.peek(), Some(Token::BlockMark)) {
            return Err(ParseError::UnexpectedToken(
                self.name.clone(),
                "block mark ':'".to_string(),
            ));
        }
        Ok(())
    }

    fn expression_tag(&mut self) -> Result<Node, ParseError> {
        let params = self.params()?;
        self.reject_block_mark()?;
        let expr = ExpressionParser::new(&self.name, &params).single()?;
        Ok(Node::Expression(expr))
    }

    fn named_tag(&mut self, name: String) -> Result<Node, ParseError> {
        if name == "inline" {
            return self.inline_tag();
        }

        let def = self.entities.block(&name).cloned();
        if let Some(def) = def {
            if def.is_chained() {
                // a continuation with nothing to continue
                return Err(ParseError::BlockNotOpen(self.name.clone(), name));
            }
            match name.as_str() {
                "for" => return self.loop_block(),
                "if" => return self.conditional_block(),
                _ => {}
            }
            return Err(ParseError::UnsupportedBlock(self.name.clone(), name));
        }

        if self.entities.function(&name).is_some() {
            let params = self.params()?;
            self.reject_block_mark()?;
            let arguments = ExpressionParser::new(&self.name, &params).list()?;
            return Ok(Node::Call { name, arguments });
        }

        // a closer with no open block
        Err(ParseError::BlockNotOpen(self.name.clone(), name))
    }

    fn inline_tag(&mut self) -> Result<Node, ParseError> {
        let params = self.params()?;
        self.reject_block_mark()?;
        let filtered: Vec<&Token> = params
            .iter()
            .filter(|token| !matches!(token, Token::Whitespace(_)))
            .collect();
        match filtered.as_slice() {
            [Token::Param(ParamToken::Literal(Literal::Str(name)))] => {
                Ok(Node::Inline { name: name.clone() })
            }
            _ => Err(ParseError::InlineName(self.name.clone())),
        }
    }

    fn loop_block(&mut self) -> Result<Node, ParseError> {
        let params = self.params()?;
        self.expect_block_mark()?;
        let (binding, collection) = self.loop_signature(&params)?;
        let (body, terminator) = self.nodes(&["endfor"])?;
        match terminator {
            Some(_) => Ok(Node::Loop {
                binding,
                collection,
                body,
            }),
            None => Err(ParseError::UnclosedBlock(
                self.name.clone(),
                "for".to_string(),
            )),
        }
    }

    fn loop_signature(
        &self,
        params: &[Token],
    ) -> Result<(String, Expression), ParseError> {
        let filtered: Vec<Token> = params
            .iter()
            .filter(|token| !matches!(token, Token::Whitespace(_)))
            .cloned()
            .collect();
        let binding = match filtered.first() {
            Some(Token::Param(ParamToken::Variable(name))) => name.clone(),
            Some(Token::Param(ParamToken::Keyword(Keyword::Discard))) => {
                "_".to_string()
            }
            _ => {
                return Err(ParseError::LoopSignature(
                    self.name.clone(),
                    "expected a binding identifier".to_string(),
                ))
            }
        };
        match filtered.get(1) {
            Some(Token::Param(ParamToken::Keyword(Keyword::In))) => {}
            _ => {
                return Err(ParseError::LoopSignature(
                    self.name.clone(),
                    "expected 'in' after the binding".to_string(),
                ))
            }
        }
        let collection =
            ExpressionParser::new(&self.name, &filtered[2..]).single()?;
        Ok((binding, collection))
    }

    fn conditional_block(&mut self) -> Result<Node, ParseError> {
        let params = self.params()?;
        self.expect_block_mark()?;
        let mut condition =
            Some(ExpressionParser::new(&self.name, &params).single()?);
        let mut branches = Vec::new();
        let mut terminal = false;
        loop {
            let (body, terminator) =
                self.nodes(&["elseif", "else", "endif"])?;
            branches.push(Branch {
                condition: condition.take(),
                body,
            });
            match terminator.as_deref() {
                Some("elseif") => {
                    if terminal {
                        return Err(ParseError::ChainTerminated(
                            self.name.clone(),
                            "elseif".to_string(),
                        ));
                    }
                    let params = self.params()?;
                    self.expect_block_mark()?;
                    condition = Some(
                        ExpressionParser::new(&self.name, &params).single()?,
                    );
                }
                Some("else") => {
                    if terminal {
                        return Err(ParseError::ChainTerminated(
                            self.name.clone(),
                            "else".to_string(),
                        ));
                    }
                    self.expect_block_mark()?;
                    terminal = true;
                }
                Some(_) => return Ok(Node::Conditional { branches }),
                None => {
                    return Err(ParseError::UnclosedBlock(
                        self.name.clone(),
                        "if".to_string(),
                    ))
                }
            }
        }
    }
}
