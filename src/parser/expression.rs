//! Parameter expressions.
//!
//! Parameter token runs are folded into expression trees here by
//! precedence climbing; the serializer walks the finished tree.
use crate::{
    error::ParseError,
    lexer::token::{Keyword, Literal, Operator, ParamToken, Token},
};

/// A parsed parameter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Literal),
    /// A reserved keyword in value position.
    Keyword(Keyword),
    /// A variable, resolved against scopes then the context.
    Variable(String),
    /// A variable resolved only against the root table, `$name`.
    RootVariable(String),
    /// A prefix operator application.
    Unary(Operator, Box<Expression>),
    /// An infix operator application.
    Binary(Operator, Box<Expression>, Box<Expression>),
    /// Member access, `target.field`.
    Member(Box<Expression>, String),
    /// Subscript access, `target[index]`.
    Subscript(Box<Expression>, Box<Expression>),
    /// A function call.
    Call {
        /// Function name.
        name: String,
        /// Call arguments.
        arguments: Vec<Argument>,
    },
}

/// A call argument with an optional label.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    /// Argument label, if given.
    pub label: Option<String>,
    /// Argument value.
    pub value: Expression,
}

fn binary_precedence(op: Operator) -> Option<u8> {
    match op {
        Operator::Assignment => Some(1),
        Operator::NilCoalesce => Some(2),
        Operator::Or => Some(3),
        Operator::And => Some(4),
        Operator::Equal | Operator::NotEqual => Some(5),
        Operator::Greater
        | Operator::GreaterOrEqual
        | Operator::Lesser
        | Operator::LesserOrEqual => Some(6),
        Operator::Plus | Operator::Minus => Some(7),
        Operator::Multiply | Operator::Divide | Operator::Modulo => Some(8),
        _ => None,
    }
}

pub(crate) fn describe(token: &Token) -> String {
    match token {
        Token::Raw(_) => "raw text".to_string(),
        Token::TagMark => "tag mark".to_string(),
        Token::Tag(Some(name)) => format!("tag '{}'", name),
        Token::Tag(None) => "anonymous tag".to_string(),
        Token::BlockMark => "block mark ':'".to_string(),
        Token::ParamsStart => "'('".to_string(),
        Token::ParamsEnd => "')'".to_string(),
        Token::ParamDelimit => "','".to_string(),
        Token::LabelMark => "label mark ':'".to_string(),
        Token::Param(param) => format!("parameter '{}'", param),
        Token::Whitespace(_) => "whitespace".to_string(),
    }
}

/// Precedence climbing parser over one parameter token run.
pub(crate) struct ExpressionParser<'tokens> {
    name: String,
    tokens: &'tokens [Token],
    offset: usize,
}

impl<'tokens> ExpressionParser<'tokens> {
    pub fn new(name: &str, tokens: &'tokens [Token]) -> Self {
        Self {
            name: name.to_string(),
            tokens,
            offset: 0,
        }
    }

    /// Parse the entire run as one expression.
    pub fn single(mut self) -> Result<Expression, ParseError> {
        let expr = self.expression(1)?;
        self.skip_whitespace();
        match self.peek() {
            Some(token) => Err(ParseError::UnexpectedToken(
                self.name,
                describe(token),
            )),
            None => Ok(expr),
        }
    }

    /// Parse the entire run as a comma separated argument list.
    pub fn list(mut self) -> Result<Vec<Argument>, ParseError> {
        let mut arguments = Vec::new();
        self.skip_whitespace();
        if self.peek().is_none() {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.argument()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(Token::ParamDelimit) => {
                    self.offset += 1;
                }
                Some(token) => {
                    return Err(ParseError::UnexpectedToken(
                        self.name,
                        describe(token),
                    ))
                }
            }
        }
        Ok(arguments)
    }

    fn peek(&self) -> Option<&'tokens Token> {
        self.tokens.get(self.offset)
    }

    fn peek_ahead(&self, ahead: usize) -> Option<&'tokens Token> {
        self.tokens.get(self.offset + ahead)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.offset)
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof(self.name.clone()))?;
        self.offset += 1;
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(Token::Whitespace(_))) {
            self.offset += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        self.skip_whitespace();
        let token = self.next()?;
        if &token == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(
                self.name.clone(),
                describe(&token),
            ))
        }
    }

    fn argument(&mut self) -> Result<Argument, ParseError> {
        self.skip_whitespace();
        let label = match (self.peek(), self.peek_ahead(1)) {
            (
                Some(Token::Param(ParamToken::Variable(name))),
                Some(Token::LabelMark),
            ) => {
                let name = name.clone();
                self.offset += 2;
                Some(name)
            }
            _ => None,
        };
        let value = self.expression(1)?;
        Ok(Argument { label, value })
    }

    fn expression(&mut self, min: u8) -> Result<Expression, ParseError> {
        let mut left = self.unary()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some(Token::Param(ParamToken::Operator(op))) => *op,
                _ => break,
            };
            let precedence = match binary_precedence(op) {
                Some(p) if p >= min => p,
                _ => break,
            };
            self.offset += 1;
            let right = self.expression(precedence + 1)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(Token::Param(ParamToken::Operator(op)))
                if matches!(
                    op,
                    Operator::Not | Operator::Minus | Operator::Evaluate
                ) =>
            {
                let op = *op;
                self.offset += 1;
                Ok(Expression::Unary(op, Box::new(self.unary()?)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.primary()?;
        loop {
            // a retained whitespace token splits a subscript from an
            // unrelated trailing collection, so do not skip here
            match self.peek() {
                Some(Token::Param(ParamToken::Operator(
                    Operator::ScopeMember,
                ))) => {
                    self.offset += 1;
                    let field = match self.next()? {
                        Token::Param(ParamToken::Variable(name)) => name,
                        token => {
                            return Err(ParseError::UnexpectedToken(
                                self.name.clone(),
                                describe(&token),
                            ))
                        }
                    };
                    expr = Expression::Member(Box::new(expr), field);
                }
                Some(Token::Param(ParamToken::Operator(Operator::SubOpen))) => {
                    self.offset += 1;
                    let index = self.expression(1)?;
                    self.expect(&Token::Param(ParamToken::Operator(
                        Operator::SubClose,
                    )))?;
                    expr =
                        Expression::Subscript(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        self.skip_whitespace();
        match self.next()? {
            Token::Param(ParamToken::Literal(literal)) => {
                Ok(Expression::Literal(literal))
            }
            Token::Param(ParamToken::Keyword(keyword)) => match keyword {
                Keyword::True | Keyword::Yes => {
                    Ok(Expression::Literal(Literal::Bool(true)))
                }
                Keyword::False | Keyword::No => {
                    Ok(Expression::Literal(Literal::Bool(false)))
                }
                keyword => Ok(Expression::Keyword(keyword)),
            },
            Token::Param(ParamToken::Variable(name)) => {
                Ok(Expression::Variable(name))
            }
            Token::Param(ParamToken::Operator(Operator::ScopeRoot)) => {
                match self.next()? {
                    Token::Param(ParamToken::Variable(name)) => {
                        Ok(Expression::RootVariable(name))
                    }
                    token => Err(ParseError::UnexpectedToken(
                        self.name.clone(),
                        describe(&token),
                    )),
                }
            }
            Token::Param(ParamToken::Function(name)) => {
                self.expect(&Token::ParamsStart)?;
                let arguments = self.call_arguments()?;
                Ok(Expression::Call { name, arguments })
            }
            Token::ParamsStart => {
                let expr = self.expression(1)?;
                self.expect(&Token::ParamsEnd)?;
                Ok(expr)
            }
            token => Err(ParseError::UnexpectedToken(
                self.name.clone(),
                describe(&token),
            )),
        }
    }

    // Arguments of a nested call; consumes through the matching
    // closing parenthesis.
    fn call_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        let mut arguments = Vec::new();
        self.skip_whitespace();
        if matches!(self.peek(), Some(Token::ParamsEnd)) {
            self.offset += 1;
            return Ok(arguments);
        }
        loop {
            arguments.push(self.argument()?);
            self.skip_whitespace();
            match self.next()? {
                Token::ParamDelimit => continue,
                Token::ParamsEnd => break,
                token => {
                    return Err(ParseError::UnexpectedToken(
                        self.name.clone(),
                        describe(&token),
                    ))
                }
            }
        }
        Ok(arguments)
    }
}
