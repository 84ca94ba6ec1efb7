//! Errors generated when rendering templates.
use std::fmt;
use thiserror::Error;

use crate::error::SourceError;

/// A chain of ancestor template names, innermost last.
///
/// Used to report where in a resolution a cyclical reference
/// was discovered.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Chain(
    /// Ancestor names, outermost first.
    pub Vec<String>,
);

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(" -> "))
    }
}

/// Errors raised while orchestrating or serializing a render.
#[derive(Error)]
pub enum RenderError {
    /// No source holds the requested template.
    #[error("No template found for '{0}'")]
    NoTemplateExists(String),
    /// The request used a malformed source name.
    #[error("Illegal access via '{0}', source names may not contain ':' or start with '$'")]
    IllegalAccess(String),
    /// Inline resolution found a template that transitively
    /// references itself.
    #[error("Cyclical reference to '{0}' in resolution chain {1}")]
    CyclicalReference(String, Chain),
    /// A variable lookup failed.
    #[error("Variable '{0}' not found, check the variable path and verify the template data")]
    VariableNotFound(String),
    /// A function call named an unregistered function.
    #[error("Function '{0}' not found, check the name")]
    FunctionNotFound(String),
    /// An operator reached evaluation in a position it cannot be
    /// evaluated in.
    #[error("Operator '{0}' is not valid in this position")]
    UnsupportedOperator(String),
    /// An operator or function was applied to values it does not
    /// accept.
    #[error("Invalid operand for '{0}': {1}")]
    InvalidOperand(String, String),
    /// Serialization reached an inline reference that was never
    /// substituted.
    #[error("Template contains an unresolved reference to '{0}'")]
    UnresolvedReference(String),
    /// Catch-all with a message.
    #[error("{0}")]
    UnknownError(String),
    /// A source failed while reading template bytes.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Context data could not be converted to template data.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl fmt::Debug for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl PartialEq for RenderError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoTemplateExists(ref s), Self::NoTemplateExists(ref o)) => {
                s == o
            }
            (Self::IllegalAccess(ref s), Self::IllegalAccess(ref o)) => s == o,
            (
                Self::CyclicalReference(ref s, ref sc),
                Self::CyclicalReference(ref o, ref oc),
            ) => s == o && sc == oc,
            (Self::VariableNotFound(ref s), Self::VariableNotFound(ref o)) => {
                s == o
            }
            (Self::FunctionNotFound(ref s), Self::FunctionNotFound(ref o)) => {
                s == o
            }
            (Self::UnresolvedReference(ref s), Self::UnresolvedReference(ref o)) => {
                s == o
            }
            _ => false,
        }
    }
}

impl Eq for RenderError {}
