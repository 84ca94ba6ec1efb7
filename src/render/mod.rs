//! Render orchestration: fetch, arbitrate, resolve and serialize.
//!
//! A renderer is a value type per request; the cache and the source
//! set it is parameterized with are the shared state. Every render
//! follows the same pipeline: find a compiled document (cache hit or
//! source read), arbitrate it (cache it when self-contained, resolve
//! its inline references otherwise), then serialize it with the
//! caller's data and feed the observed timing back to the cache.
use futures::future::{try_join_all, BoxFuture};
use log::{debug, trace};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    ast::{Ast, AstKey, Touch, DEFAULT_SOURCE},
    cache::AstCache,
    entity::Entities,
    error::{Chain, Error, RenderError},
    lexer::{Lexer, RawTemplate},
    parser::Parser,
    serialize::{self, VariableTable},
    source::SourceSet,
};

/// Ceiling on a document's average serialization time for the
/// synchronous fast path.
pub const DEFAULT_BLOCK_LIMIT: Duration = Duration::from_millis(50);

/// Renders templates by name.
#[derive(Clone)]
pub struct Renderer {
    entities: Arc<Entities>,
    sources: Arc<SourceSet>,
    cache: Arc<dyn AstCache>,
    block_limit: Duration,
}

impl Renderer {
    /// Create a renderer over shared entities, sources and cache.
    pub fn new(
        entities: Arc<Entities>,
        sources: Arc<SourceSet>,
        cache: Arc<dyn AstCache>,
    ) -> Self {
        Self {
            entities,
            sources,
            cache,
            block_limit: DEFAULT_BLOCK_LIMIT,
        }
    }

    /// The entity registry.
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    /// The source set templates are read from.
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// The shared document cache.
    pub fn cache(&self) -> &Arc<dyn AstCache> {
        &self.cache
    }

    /// The fast path eligibility threshold.
    pub fn block_limit(&self) -> Duration {
        self.block_limit
    }

    /// Change the fast path eligibility threshold.
    ///
    /// This is policy for choosing the synchronous path, not a
    /// deadline; renders over the limit still complete.
    pub fn set_block_limit(&mut self, limit: Duration) {
        self.block_limit = limit;
    }

    /// Render the template at `path`, which may carry an explicit
    /// `source:` prefix, using `data` as the context dictionary.
    pub async fn render<T>(&self, path: &str, data: &T) -> Result<Vec<u8>, Error>
    where
        T: Serialize,
    {
        let key = self.request_key(path)?;
        let context = serde_json::to_value(data).map_err(RenderError::from)?;
        self.execute(key, context, None).await
    }

    /// Render the template at `path` from the named source.
    pub async fn render_from<T>(
        &self,
        source: &str,
        path: &str,
        data: &T,
    ) -> Result<Vec<u8>, Error>
    where
        T: Serialize,
    {
        if path.contains(':') {
            return Err(
                RenderError::IllegalAccess(path.to_string()).into()
            );
        }
        let key = self.explicit_key(source, path)?;
        let context = serde_json::to_value(data).map_err(RenderError::from)?;
        self.execute(key, context, None).await
    }

    /// Render with additional root table entries.
    ///
    /// Entries whose keys are not valid identifiers are skipped
    /// silently; values are template data as is.
    pub async fn render_with_info<T>(
        &self,
        path: &str,
        data: &T,
        user_info: &HashMap<String, Value>,
    ) -> Result<Vec<u8>, Error>
    where
        T: Serialize,
    {
        let key = self.request_key(path)?;
        let context = serde_json::to_value(data).map_err(RenderError::from)?;
        self.execute(key, context, Some(user_info)).await
    }

    fn request_key(&self, path: &str) -> Result<AstKey, RenderError> {
        if path.is_empty() {
            return Err(RenderError::NoTemplateExists(
                "(empty path)".to_string(),
            ));
        }
        match path.split_once(':') {
            Some((source, rest)) => self.explicit_key(source, rest),
            None => Ok(AstKey::default_scope(path)),
        }
    }

    fn explicit_key(
        &self,
        source: &str,
        path: &str,
    ) -> Result<AstKey, RenderError> {
        if source.is_empty()
            || source.contains(':')
            || (source.starts_with('$') && source != DEFAULT_SOURCE)
        {
            return Err(RenderError::IllegalAccess(source.to_string()));
        }
        if path.is_empty() {
            return Err(RenderError::NoTemplateExists(
                "(empty path)".to_string(),
            ));
        }
        if path.contains(':') {
            return Err(RenderError::IllegalAccess(format!(
                "{}:{}",
                source, path
            )));
        }
        Ok(AstKey::new(source, path))
    }

    async fn execute(
        &self,
        key: AstKey,
        context: Value,
        user_info: Option<&HashMap<String, Value>>,
    ) -> Result<Vec<u8>, Error> {
        let mut table = VariableTable::new(context);
        if let Some(info) = user_info {
            table = table.with_user_info(info);
        }
        let name = key.name();

        // a synchronous cache hit that is self-contained and cheap by
        // prior observation serializes on the calling thread without
        // ever suspending
        let mut probed: Option<Ast> = None;
        if let Some(sync) = self.cache.sync_interface() {
            if let Some(ast) = sync.retrieve(&name) {
                if ast.required().is_empty()
                    && ast.info().exec_avg() < self.block_limit
                {
                    trace!("fast path for '{}'", name);
                    let (buffer, exec) = self.serialize(&ast, &table)?;
                    sync.touch(
                        &name,
                        Touch {
                            exec,
                            size: buffer.len(),
                        },
                    );
                    return Ok(buffer);
                }
                probed = Some(ast);
            }
        }

        let ast = match probed {
            Some(ast) => ast,
            None => self.fetch(&key).await?,
        };
        let ast = self.arbitrate(ast, Vec::new()).await?;

        let (buffer, exec) = self.serialize(&ast, &table)?;
        let touch = Touch {
            exec,
            size: buffer.len(),
        };
        if let Some(sync) = self.cache.sync_interface() {
            sync.touch(&name, touch);
        } else {
            self.cache.touch(&name, touch).await;
        }
        Ok(buffer)
    }

    fn serialize(
        &self,
        ast: &Ast,
        table: &VariableTable,
    ) -> Result<(Vec<u8>, Duration), RenderError> {
        let mut buffer = Vec::new();
        let exec = serialize::serialize(&self.entities, ast, table, &mut buffer)?;
        Ok((buffer, exec))
    }

    // Probe the cache, preferring the synchronous interface, and
    // fall back to reading the template from its source.
    async fn fetch(&self, key: &AstKey) -> Result<Ast, Error> {
        let name = key.name();
        if let Some(sync) = self.cache.sync_interface() {
            if let Some(ast) = sync.retrieve(&name) {
                debug!("cache hit '{}'", name);
                return Ok(ast);
            }
        } else if let Some(ast) = self.cache.retrieve(&name).await {
            debug!("cache hit '{}'", name);
            return Ok(ast);
        }
        debug!("cache miss '{}'", name);
        self.read(key).await
    }

    async fn read(&self, key: &AstKey) -> Result<Ast, Error> {
        let (origin, bytes) = self.sources.find(key).await?;
        trace!("template '{}' read from source '{}'", key, origin);
        let text = String::from_utf8(bytes).map_err(|err| {
            RenderError::UnknownError(format!(
                "template '{}' is not valid UTF-8: {}",
                key, err
            ))
        })?;
        // TODO: lexing and parsing run on the scheduler thread and
        // block it for large templates; move them onto a blocking
        // worker pool.
        let raw = RawTemplate::new(&key.name(), &text);
        let tokens = Lexer::new(raw, &self.entities).lex()?;
        let ast = Parser::new(key.clone(), tokens, &self.entities).parse()?;
        Ok(ast)
    }

    // Either cache a self-contained document or resolve its inline
    // references recursively, carrying the chain of ancestor names
    // for cycle detection. The chain, not the root's requires set,
    // decides what is cyclical: diamond shaped inlines are legal.
    fn arbitrate(
        &self,
        ast: Ast,
        chain: Vec<String>,
    ) -> BoxFuture<'_, Result<Ast, Error>> {
        Box::pin(async move {
            if ast.required().is_empty() {
                if ast.cached() {
                    return Ok(ast);
                }
                let mut ast = ast;
                ast.set_cached(true);
                let stored = if let Some(sync) = self.cache.sync_interface() {
                    sync.insert(ast, true)?
                } else {
                    self.cache.insert(ast, true).await?
                };
                return Ok(stored);
            }

            let mut chain = chain;
            chain.push(ast.name().to_string());
            if let Some(node) = ast
                .required()
                .iter()
                .find(|name| chain.contains(*name))
            {
                return Err(RenderError::CyclicalReference(
                    node.clone(),
                    Chain(chain),
                )
                .into());
            }

            let required: Vec<String> =
                ast.required().iter().cloned().collect();
            debug!(
                "resolving {} inline(s) for '{}'",
                required.len(),
                ast.name()
            );
            let subs = try_join_all(required.iter().map(|name| {
                let chain = chain.clone();
                async move {
                    let sub = self.fetch(&AstKey::from_name(name)).await?;
                    self.arbitrate(sub, chain).await
                }
            }))
            .await?;

            let mut ast = ast;
            for sub in &subs {
                ast.inline(sub);
            }
            self.arbitrate(ast, chain).await
        })
    }
}
