#![deny(missing_docs)]

//! Frond is an asynchronous template engine for a lightweight tag
//! language: directives start with a configurable indicator
//! (conventionally `#`) and cover atomic function calls, block
//! constructs with chained continuations, inlined sub-templates and
//! parameter expressions with literals, variables and operators.
//!
//! Templates compile to a syntax tree that is cached and shared
//! across renders. Documents may reference other templates with
//! `#inline("name")`; the renderer resolves the resulting dependency
//! graph concurrently, detects cycles and substitutes each resolved
//! sub-tree before serialization. Fully resolved documents whose
//! prior renders were cheap take a synchronous fast path that never
//! touches the scheduler.
//!
//! The lexer classifies tag names against the registered
//! [Entities](entity::Entities), so an unknown `#word` simply decays
//! back to literal text:
//!
//! ```ignore
//! let entities = Arc::new(Entities::core());
//! let mut sources = SourceSet::new();
//! sources.register_default(Arc::new(
//!     MemorySource::new().with("hello", "Hello, #(name)!"),
//! ))?;
//! let renderer = Renderer::new(
//!     entities,
//!     Arc::new(sources),
//!     Arc::new(MemoryCache::new()),
//! );
//! let bytes = renderer.render("hello", &json!({"name": "world"})).await?;
//! assert_eq!(b"Hello, world!", &bytes[..]);
//! ```
//!
//! ## Sources
//!
//! Templates are read from a [SourceSet](source::SourceSet), a named
//! registry of byte providers. A render path may carry an explicit
//! `source:` prefix; without one the sources are searched in
//! registration order. The default scope is named `$`; other names
//! starting with `$`, or containing `:`, are rejected as illegal.
//!
//! ## Caching
//!
//! Compiled documents live in an [AstCache](cache::AstCache) keyed by
//! name. The cache is asynchronous; implementations that can answer
//! without suspending advertise a synchronous interface which the
//! renderer prefers, both for plain probes and for the fast path.
//! Successful renders touch the cache with the observed
//! serialization time and output size.
//!
//! ## Entities
//!
//! Block constructs (`for`, `if`/`elseif`/`else`) and template
//! functions are registered in [Entities](entity::Entities); custom
//! functions implement
//! [TemplateFunction](entity::TemplateFunction):
//!
//! ```ignore
//! entities.register_function("shout", Box::new(Shout {}));
//! ```

pub mod ast;
pub mod cache;
pub mod entity;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod serialize;
pub mod source;

/// Result type returned by the renderer.
pub type Result<T> = std::result::Result<T, error::Error>;

/// Result type returned when serializing templates.
pub type RenderResult<T> = std::result::Result<T, error::RenderError>;

/// Result type returned when lexing templates.
pub type LexResult<T> = std::result::Result<T, error::LexerError>;

pub use ast::{Ast, AstKey};
pub use cache::{AstCache, MemoryCache, SyncAstCache};
pub use entity::Entities;
pub use error::Error;
pub use render::Renderer;
pub use source::{MemorySource, Source, SourceSet};
