//! Compiled templates and their cache metadata.
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::parser::Node;

/// Name of the default source scope.
pub const DEFAULT_SOURCE: &str = "$";

/// Identifies a template within a source scope.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AstKey {
    source: String,
    path: String,
}

impl AstKey {
    /// A key naming an explicit source.
    pub fn new(source: &str, path: &str) -> Self {
        Self {
            source: source.to_string(),
            path: path.to_string(),
        }
    }

    /// A key resolved through the default search order.
    pub fn default_scope(path: &str) -> Self {
        Self::new(DEFAULT_SOURCE, path)
    }

    /// Rebuild a key from a document name.
    pub fn from_name(name: &str) -> Self {
        match name.split_once(':') {
            Some((source, path)) => Self::new(source, path),
            None => Self::default_scope(name),
        }
    }

    /// The source scope.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The template path within the source.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this key resolves through the default search order.
    pub fn is_default_scope(&self) -> bool {
        self.source == DEFAULT_SOURCE
    }

    /// The document name this key caches under; the bare path for the
    /// default scope, `source:path` otherwise.
    pub fn name(&self) -> String {
        if self.is_default_scope() {
            self.path.clone()
        } else {
            format!("{}:{}", self.source, self.path)
        }
    }
}

impl fmt::Display for AstKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One observation of a completed serialization.
#[derive(Clone, Copy, Debug)]
pub struct Touch {
    /// Wall time the serializer spent.
    pub exec: Duration,
    /// Bytes produced.
    pub size: usize,
}

/// Rolling statistics for a cached document.
///
/// Touches only ever update these numbers; the semantic fields of the
/// owning document are frozen once it is cached.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AstInfo {
    required_asts: Vec<String>,
    exec_avg: Duration,
    size_avg: usize,
    touches: u64,
}

impl AstInfo {
    /// Names of templates this document still references, sorted.
    pub fn required_asts(&self) -> &[String] {
        &self.required_asts
    }

    /// Rolling average serialization time.
    pub fn exec_avg(&self) -> Duration {
        self.exec_avg
    }

    /// Rolling average output size in bytes.
    pub fn size_avg(&self) -> usize {
        self.size_avg
    }

    /// Number of recorded serializations.
    pub fn touches(&self) -> u64 {
        self.touches
    }

    /// Fold one observation into the rolling averages.
    pub fn record(&mut self, touch: Touch) {
        self.touches += 1;
        let count = self.touches as i128;

        let exec = self.exec_avg.as_nanos() as i128;
        let sample = touch.exec.as_nanos() as i128;
        self.exec_avg =
            Duration::from_nanos((exec + (sample - exec) / count) as u64);

        let size = self.size_avg as i128;
        let sample = touch.size as i128;
        self.size_avg = (size + (sample - size) / count) as usize;
    }

    fn set_required(&mut self, required: &HashSet<String>) {
        let mut names: Vec<String> = required.iter().cloned().collect();
        names.sort();
        self.required_asts = names;
    }
}

/// A compiled template document.
#[derive(Clone, Debug, PartialEq)]
pub struct Ast {
    name: String,
    key: AstKey,
    tree: Vec<Node>,
    required: HashSet<String>,
    cached: bool,
    info: AstInfo,
}

impl Ast {
    /// Create a document from a parsed tree, recording any inline
    /// references it still needs resolved.
    pub fn new(key: AstKey, tree: Vec<Node>) -> Self {
        let mut required = HashSet::new();
        collect_inlines(&tree, &mut required);
        let mut info = AstInfo::default();
        info.set_required(&required);
        Self {
            name: key.name(),
            key,
            tree,
            required,
            cached: false,
            info,
        }
    }

    /// The document name used for caching.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key this document was compiled from.
    pub fn key(&self) -> &AstKey {
        &self.key
    }

    /// The compiled node tree.
    pub fn tree(&self) -> &[Node] {
        &self.tree
    }

    /// Names of templates that must be inlined before this document
    /// can be serialized. Empty means renderable as is.
    pub fn required(&self) -> &HashSet<String> {
        &self.required
    }

    /// Whether this document is the canonical cached copy.
    pub fn cached(&self) -> bool {
        self.cached
    }

    /// Touch statistics.
    pub fn info(&self) -> &AstInfo {
        &self.info
    }

    pub(crate) fn info_mut(&mut self) -> &mut AstInfo {
        &mut self.info
    }

    pub(crate) fn set_cached(&mut self, cached: bool) {
        self.cached = cached;
    }

    /// Substitute a resolved document over every reference to it.
    pub fn inline(&mut self, sub: &Ast) {
        splice(&mut self.tree, sub.name(), sub.tree());
        let mut required = HashSet::new();
        collect_inlines(&self.tree, &mut required);
        self.info.set_required(&required);
        self.required = required;
    }
}

fn collect_inlines(nodes: &[Node], required: &mut HashSet<String>) {
    for node in nodes {
        match node {
            Node::Inline { name } => {
                required.insert(name.clone());
            }
            Node::Conditional { branches } => {
                for branch in branches {
                    collect_inlines(&branch.body, required);
                }
            }
            Node::Loop { body, .. } => collect_inlines(body, required),
            Node::Scope(nodes) => collect_inlines(nodes, required),
            _ => {}
        }
    }
}

fn splice(nodes: &mut [Node], name: &str, replacement: &[Node]) {
    for node in nodes.iter_mut() {
        match node {
            Node::Inline { name: reference } if reference == name => {
                *node = Node::Scope(replacement.to_vec());
            }
            Node::Conditional { branches } => {
                for branch in branches.iter_mut() {
                    splice(&mut branch.body, name, replacement);
                }
            }
            Node::Loop { body, .. } => splice(body, name, replacement),
            Node::Scope(inner) => splice(inner, name, replacement),
            _ => {}
        }
    }
}
