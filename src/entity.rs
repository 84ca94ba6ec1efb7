//! Registered template entities.
//!
//! The entity registry drives the lexer (which tag names are live),
//! the parser (how blocks chain) and the serializer (which functions
//! are callable). Functions must implement `Clone` so registries can
//! be duplicated and shared across renderers.
use dyn_clone::DynClone;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::error::RenderError;

/// Result type that template function implementations return.
pub type FunctionValue = std::result::Result<Value, RenderError>;

/// Trait for functions callable from parameter expressions
/// and as atomic tags.
pub trait TemplateFunction: Send + Sync + DynClone {
    /// Invoke with the evaluated arguments in call order.
    fn invoke(&self, arguments: &[Value]) -> FunctionValue;
}

dyn_clone::clone_trait_object!(TemplateFunction);

/// Metadata describing a registered block construct.
#[derive(Clone, Debug, Default)]
pub struct BlockDef {
    chains_to: Vec<String>,
    empty_signature: bool,
}

impl BlockDef {
    /// A plain block closed by its `end` tag.
    pub fn new() -> Self {
        Default::default()
    }

    /// Mark this block as a continuation of the named predecessors.
    pub fn chained_to(mut self, predecessors: &[&str]) -> Self {
        self.chains_to =
            predecessors.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Mark this block as taking no call signature at all, making it
    /// a terminal continuation like `else`.
    pub fn with_empty_signature(mut self) -> Self {
        self.empty_signature = true;
        self
    }

    /// Names of the blocks this block may continue.
    pub fn chains_to(&self) -> &[String] {
        &self.chains_to
    }

    /// Whether this block is a chained continuation.
    pub fn is_chained(&self) -> bool {
        !self.chains_to.is_empty()
    }

    /// Whether this block takes no call signature.
    pub fn has_empty_signature(&self) -> bool {
        self.empty_signature
    }
}

/// Collection of blocks and functions, plus the tag indicator.
#[derive(Clone)]
pub struct Entities {
    tag_indicator: char,
    blocks: HashMap<String, BlockDef>,
    functions: HashMap<String, Box<dyn TemplateFunction>>,
}

impl Entities {
    /// An empty registry with the default `#` indicator.
    pub fn new() -> Self {
        Self {
            tag_indicator: '#',
            blocks: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// The registry with the core blocks and functions installed.
    pub fn core() -> Self {
        let mut entities = Self::new();
        entities.register_block("for", BlockDef::new());
        entities.register_block("if", BlockDef::new());
        entities.register_block(
            "elseif",
            BlockDef::new().chained_to(&["if", "elseif"]),
        );
        entities.register_block(
            "else",
            BlockDef::new()
                .chained_to(&["if", "elseif"])
                .with_empty_signature(),
        );

        entities.register_function("inline", Box::new(Inline {}));
        entities.register_function("count", Box::new(Count {}));
        entities.register_function("lowercased", Box::new(Lowercased {}));
        entities.register_function("uppercased", Box::new(Uppercased {}));
        entities.register_function("contains", Box::new(Contains {}));
        entities
    }

    /// The character that introduces a tag.
    pub fn tag_indicator(&self) -> char {
        self.tag_indicator
    }

    /// Change the character that introduces a tag.
    pub fn set_tag_indicator(&mut self, indicator: char) {
        self.tag_indicator = indicator;
    }

    /// Register a block construct.
    pub fn register_block(&mut self, name: &str, def: BlockDef) {
        self.blocks.insert(name.to_string(), def);
    }

    /// Register a template function.
    pub fn register_function(
        &mut self,
        name: &str,
        function: Box<dyn TemplateFunction>,
    ) {
        self.functions.insert(name.to_string(), function);
    }

    /// Get a block definition.
    pub fn block(&self, name: &str) -> Option<&BlockDef> {
        self.blocks.get(name)
    }

    /// Get a template function.
    pub fn function(&self, name: &str) -> Option<&Box<dyn TemplateFunction>> {
        self.functions.get(name)
    }

    /// Identifiers that may open a tag: every block and function.
    pub fn openers(&self) -> HashSet<String> {
        self.blocks
            .keys()
            .chain(self.functions.keys())
            .cloned()
            .collect()
    }

    /// Identifiers that close a body: `end<name>` for every chain
    /// root plus chained blocks with empty signatures.
    pub fn closers(&self) -> HashSet<String> {
        let mut closers = HashSet::new();
        for (name, def) in &self.blocks {
            if def.is_chained() {
                if def.has_empty_signature() {
                    closers.insert(name.clone());
                }
            } else {
                closers.insert(format!("end{}", name));
            }
        }
        closers
    }
}

impl Default for Entities {
    fn default() -> Self {
        Self::core()
    }
}

fn arity(name: &str, expected: usize, arguments: &[Value]) -> Result<(), RenderError> {
    if arguments.len() != expected {
        return Err(RenderError::InvalidOperand(
            name.to_string(),
            format!(
                "expected {} argument(s), got {}",
                expected,
                arguments.len()
            ),
        ));
    }
    Ok(())
}

/// Placeholder for the inline directive.
///
/// Inline references are substituted before serialization; an
/// invocation can only be reached from an expression position,
/// which is not where inlining happens.
#[derive(Clone)]
pub struct Inline {}

impl TemplateFunction for Inline {
    fn invoke(&self, _arguments: &[Value]) -> FunctionValue {
        Err(RenderError::UnknownError(
            "the inline directive can only appear as a tag".to_string(),
        ))
    }
}

/// Number of elements in a collection or characters in a string.
#[derive(Clone)]
pub struct Count {}

impl TemplateFunction for Count {
    fn invoke(&self, arguments: &[Value]) -> FunctionValue {
        arity("count", 1, arguments)?;
        let count = match arguments[0] {
            Value::Array(ref list) => list.len(),
            Value::Object(ref map) => map.len(),
            Value::String(ref s) => s.chars().count(),
            _ => {
                return Err(RenderError::InvalidOperand(
                    "count".to_string(),
                    "value is not countable".to_string(),
                ))
            }
        };
        Ok(Value::from(count))
    }
}

/// Lower case a string.
#[derive(Clone)]
pub struct Lowercased {}

impl TemplateFunction for Lowercased {
    fn invoke(&self, arguments: &[Value]) -> FunctionValue {
        arity("lowercased", 1, arguments)?;
        match arguments[0] {
            Value::String(ref s) => Ok(Value::from(s.to_lowercase())),
            ref other => Err(RenderError::InvalidOperand(
                "lowercased".to_string(),
                format!("expected a string, got {}", other),
            )),
        }
    }
}

/// Upper case a string.
#[derive(Clone)]
pub struct Uppercased {}

impl TemplateFunction for Uppercased {
    fn invoke(&self, arguments: &[Value]) -> FunctionValue {
        arity("uppercased", 1, arguments)?;
        match arguments[0] {
            Value::String(ref s) => Ok(Value::from(s.to_uppercase())),
            ref other => Err(RenderError::InvalidOperand(
                "uppercased".to_string(),
                format!("expected a string, got {}", other),
            )),
        }
    }
}

/// Membership test for arrays, objects and strings.
#[derive(Clone)]
pub struct Contains {}

impl TemplateFunction for Contains {
    fn invoke(&self, arguments: &[Value]) -> FunctionValue {
        arity("contains", 2, arguments)?;
        let found = match (&arguments[0], &arguments[1]) {
            (Value::Array(list), needle) => list.contains(needle),
            (Value::Object(map), Value::String(key)) => map.contains_key(key),
            (Value::String(haystack), Value::String(needle)) => {
                haystack.contains(needle.as_str())
            }
            _ => {
                return Err(RenderError::InvalidOperand(
                    "contains".to_string(),
                    "value is not searchable".to_string(),
                ))
            }
        };
        Ok(Value::Bool(found))
    }
}
