//! Serialize a resolved document to bytes using the template data.
//!
//! Serialization is a pure tree walk: expressions are evaluated
//! against the variable table and a stack of loop scopes, and the
//! resulting text is appended to the caller's buffer. The walk also
//! times itself so the renderer can feed the cache statistics.
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::{
    ast::Ast,
    entity::Entities,
    error::RenderError,
    lexer::{
        is_identifier,
        token::{Keyword, Literal, Operator},
    },
    parser::{Argument, Branch, Expression, Node},
};

pub mod scope;
pub(crate) mod value;

pub use scope::Scope;

/// Variable bindings for one render.
///
/// The caller's context dictionary is always available as `self`;
/// bare variable lookups fall back to its fields.
#[derive(Clone, Debug)]
pub struct VariableTable {
    context: Value,
    extra: Map<String, Value>,
}

impl VariableTable {
    /// Create a table around the caller's context.
    pub fn new(context: Value) -> Self {
        Self {
            context,
            extra: Map::new(),
        }
    }

    /// Add user info entries.
    ///
    /// Keys that are not valid identifiers (or that would shadow
    /// `self`) are skipped silently.
    pub fn with_user_info(mut self, info: &HashMap<String, Value>) -> Self {
        for (key, value) in info {
            if key != "self" && is_identifier(key) {
                self.extra.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// Look up a root table entry.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == "self" {
            Some(&self.context)
        } else {
            self.extra.get(name)
        }
    }

    /// The caller's context dictionary.
    pub fn context(&self) -> &Value {
        &self.context
    }
}

/// Serialize `ast` with `table`, appending bytes to `buffer`.
///
/// Returns the time spent. On failure the buffer contents are
/// indeterminate and should be discarded by the caller.
pub fn serialize(
    entities: &Entities,
    ast: &Ast,
    table: &VariableTable,
    buffer: &mut Vec<u8>,
) -> Result<Duration, RenderError> {
    let start = Instant::now();
    let mut serializer = Serializer {
        entities,
        table,
        scopes: Vec::new(),
        buffer,
    };
    serializer.nodes(ast.tree())?;
    Ok(start.elapsed())
}

struct Serializer<'render> {
    entities: &'render Entities,
    table: &'render VariableTable,
    scopes: Vec<Scope>,
    buffer: &'render mut Vec<u8>,
}

impl<'render> Serializer<'render> {
    fn nodes(&mut self, nodes: &[Node]) -> Result<(), RenderError> {
        for node in nodes {
            self.node(node)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node) -> Result<(), RenderError> {
        match node {
            Node::Raw(text) => {
                self.buffer.extend_from_slice(text.as_bytes());
                Ok(())
            }
            Node::Expression(expr) => {
                let value = self.evaluate(expr)?;
                self.write_value(&value);
                Ok(())
            }
            Node::Call { name, arguments } => {
                let value = self.call(name, arguments)?;
                self.write_value(&value);
                Ok(())
            }
            Node::Conditional { branches } => self.conditional(branches),
            Node::Loop {
                binding,
                collection,
                body,
            } => self.repeat(binding, collection, body),
            Node::Inline { name } => {
                Err(RenderError::UnresolvedReference(name.clone()))
            }
            Node::Scope(nodes) => self.nodes(nodes),
        }
    }

    fn write_value(&mut self, value: &Value) {
        self.buffer
            .extend_from_slice(value::stringify(value).as_bytes());
    }

    fn conditional(&mut self, branches: &[Branch]) -> Result<(), RenderError> {
        for branch in branches {
            let take = match branch.condition {
                Some(ref condition) => {
                    value::is_truthy(&self.evaluate(condition)?)
                }
                None => true,
            };
            if take {
                return self.nodes(&branch.body);
            }
        }
        Ok(())
    }

    fn repeat(
        &mut self,
        binding: &str,
        collection: &Expression,
        body: &[Node],
    ) -> Result<(), RenderError> {
        let items: Vec<Value> = match self.evaluate(collection)? {
            Value::Array(list) => list,
            Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
            other => {
                return Err(RenderError::InvalidOperand(
                    "for".to_string(),
                    format!("cannot iterate {}", other),
                ))
            }
        };
        for item in items {
            let mut scope = Scope::new();
            if binding != "_" {
                scope.set_local(binding, item);
            }
            self.scopes.push(scope);
            let result = self.nodes(body);
            self.scopes.pop();
            result?;
        }
        Ok(())
    }

    fn call(
        &self,
        name: &str,
        arguments: &[Argument],
    ) -> Result<Value, RenderError> {
        let function = self
            .entities
            .function(name)
            .ok_or_else(|| RenderError::FunctionNotFound(name.to_string()))?;
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(&argument.value)?);
        }
        function.invoke(&values)
    }

    // Innermost loop scope first, then the root table, then fields
    // of the caller's context.
    fn lookup(&self, name: &str) -> Option<&Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.local(name) {
                return Some(value);
            }
        }
        if let Some(value) = self.table.get(name) {
            return Some(value);
        }
        value::find_field(self.table.context(), name)
    }

    fn evaluate(&self, expr: &Expression) -> Result<Value, RenderError> {
        match expr {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Keyword(keyword) => match keyword {
                Keyword::Nil => Ok(Value::Null),
                Keyword::SelfRef => Ok(self.table.context().clone()),
                keyword => Err(RenderError::UnknownError(format!(
                    "keyword '{}' is not valid in value position",
                    keyword
                ))),
            },
            Expression::Variable(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| RenderError::VariableNotFound(name.clone())),
            Expression::RootVariable(name) => {
                self.table.get(name).cloned().ok_or_else(|| {
                    RenderError::VariableNotFound(format!("${}", name))
                })
            }
            Expression::Member(target, field) => {
                let target = self.evaluate(target)?;
                value::find_field(&target, field)
                    .cloned()
                    .ok_or_else(|| RenderError::VariableNotFound(field.clone()))
            }
            Expression::Subscript(target, index) => {
                self.subscript(target, index)
            }
            Expression::Unary(op, operand) => match op {
                Operator::Not => Ok(Value::Bool(!value::is_truthy(
                    &self.evaluate(operand)?,
                ))),
                Operator::Minus => {
                    let operand = self.evaluate(operand)?;
                    value::arithmetic(
                        Operator::Minus,
                        &Value::from(0),
                        &operand,
                    )
                }
                op => Err(RenderError::UnsupportedOperator(
                    op.as_str().to_string(),
                )),
            },
            Expression::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
            Expression::Call { name, arguments } => self.call(name, arguments),
        }
    }

    fn subscript(
        &self,
        target: &Expression,
        index: &Expression,
    ) -> Result<Value, RenderError> {
        let target = self.evaluate(target)?;
        let index = self.evaluate(index)?;
        match (&target, &index) {
            (Value::Array(list), Value::Number(n)) => n
                .as_u64()
                .and_then(|i| list.get(i as usize))
                .cloned()
                .ok_or_else(|| {
                    RenderError::InvalidOperand(
                        "[]".to_string(),
                        format!("index {} out of bounds", index),
                    )
                }),
            (Value::Object(map), Value::String(key)) => {
                map.get(key).cloned().ok_or_else(|| {
                    RenderError::VariableNotFound(key.clone())
                })
            }
            _ => Err(RenderError::InvalidOperand(
                "[]".to_string(),
                format!("cannot subscript {} with {}", target, index),
            )),
        }
    }

    fn binary(
        &self,
        op: Operator,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Value, RenderError> {
        match op {
            Operator::And => {
                if !value::is_truthy(&self.evaluate(lhs)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(value::is_truthy(&self.evaluate(rhs)?)))
            }
            Operator::Or => {
                if value::is_truthy(&self.evaluate(lhs)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(value::is_truthy(&self.evaluate(rhs)?)))
            }
            Operator::NilCoalesce => {
                // a missing variable on the left is the whole point
                let left = match self.evaluate(lhs) {
                    Ok(value) => value,
                    Err(RenderError::VariableNotFound(_)) => Value::Null,
                    Err(err) => return Err(err),
                };
                if left.is_null() {
                    self.evaluate(rhs)
                } else {
                    Ok(left)
                }
            }
            Operator::Plus
            | Operator::Minus
            | Operator::Multiply
            | Operator::Divide
            | Operator::Modulo => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                value::arithmetic(op, &lhs, &rhs)
            }
            Operator::Equal
            | Operator::NotEqual
            | Operator::Greater
            | Operator::GreaterOrEqual
            | Operator::Lesser
            | Operator::LesserOrEqual => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                Ok(Value::Bool(value::compare(op, &lhs, &rhs)?))
            }
            op => Err(RenderError::UnsupportedOperator(
                op.as_str().to_string(),
            )),
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(v) => Value::from(*v),
        Literal::Double(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Literal::Bool(v) => Value::Bool(*v),
        Literal::Str(s) => Value::from(s.clone()),
        Literal::EmptyArray => Value::Array(Vec::new()),
        Literal::EmptyDict => Value::Object(Map::new()),
    }
}
