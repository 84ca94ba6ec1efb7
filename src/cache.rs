//! Storage for compiled documents shared across renders.
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::{
    ast::{Ast, Touch},
    error::CacheError,
};

/// Asynchronous document cache shared by all renders.
///
/// A missing document is never an error; `retrieve` answers `None`
/// and the renderer falls back to reading the source.
#[async_trait]
pub trait AstCache: Send + Sync {
    /// Store a document. With `replace` unset an existing document of
    /// the same name fails the insert with [CacheError::KeyExists].
    ///
    /// The stored copy always has its cached flag set; the returned
    /// document is that canonical copy.
    async fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError>;

    /// Fetch a document by name.
    async fn retrieve(&self, name: &str) -> Option<Ast>;

    /// Drop a document by name.
    ///
    /// `None` when absent. `Some(false)` is reserved for documents
    /// that cannot be dropped because others depend on them; no
    /// shipped implementation tracks dependencies, so present
    /// documents always answer `Some(true)`.
    async fn remove(&self, name: &str) -> Option<bool>;

    /// Fold one serialization observation into the statistics of the
    /// named document. Cheap, and briefly locked at most.
    async fn touch(&self, name: &str, touch: Touch);

    /// Number of stored documents.
    async fn count(&self) -> usize;

    /// Whether the cache is active; a disabled cache behaves as if
    /// it were permanently empty.
    fn is_enabled(&self) -> bool {
        true
    }

    /// The synchronous interface, when this implementation can offer
    /// one. The renderer uses it for direct probes and the
    /// synchronous fast path.
    fn sync_interface(&self) -> Option<&dyn SyncAstCache> {
        None
    }
}

/// Direct-return variant of the cache operations.
///
/// Implementations must be thread safe; the interface exists for
/// stores where the lookup itself is never the bottleneck.
pub trait SyncAstCache: Send + Sync {
    /// As [AstCache::insert], without suspending.
    fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError>;
    /// As [AstCache::retrieve], without suspending.
    fn retrieve(&self, name: &str) -> Option<Ast>;
    /// As [AstCache::remove], without suspending.
    fn remove(&self, name: &str) -> Option<bool>;
    /// As [AstCache::touch], without suspending.
    fn touch(&self, name: &str, touch: Touch);
    /// As [AstCache::count], without suspending.
    fn count(&self) -> usize;
}

/// In-memory cache over a reader/writer locked map.
///
/// Offers the synchronous interface; the renderer will take its fast
/// path against this cache.
pub struct MemoryCache {
    documents: RwLock<HashMap<String, Ast>>,
    enabled: AtomicBool,
}

impl MemoryCache {
    /// An empty, enabled cache.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable or disable the cache.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether the cache is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncAstCache for MemoryCache {
    fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError> {
        if !self.is_enabled() {
            return Ok(ast);
        }
        let mut documents =
            self.documents.write().expect("cache lock poisoned");
        if !replace && documents.contains_key(ast.name()) {
            return Err(CacheError::KeyExists(ast.name().to_string()));
        }
        let mut ast = ast;
        ast.set_cached(true);
        debug!("cache insert '{}'", ast.name());
        documents.insert(ast.name().to_string(), ast.clone());
        Ok(ast)
    }

    fn retrieve(&self, name: &str) -> Option<Ast> {
        if !self.is_enabled() {
            return None;
        }
        self.documents
            .read()
            .expect("cache lock poisoned")
            .get(name)
            .cloned()
    }

    fn remove(&self, name: &str) -> Option<bool> {
        if !self.is_enabled() {
            return None;
        }
        self.documents
            .write()
            .expect("cache lock poisoned")
            .remove(name)
            .map(|_| true)
    }

    fn touch(&self, name: &str, touch: Touch) {
        if !self.is_enabled() {
            return;
        }
        if let Some(ast) = self
            .documents
            .write()
            .expect("cache lock poisoned")
            .get_mut(name)
        {
            ast.info_mut().record(touch);
        }
    }

    fn count(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        self.documents.read().expect("cache lock poisoned").len()
    }
}

#[async_trait]
impl AstCache for MemoryCache {
    async fn insert(&self, ast: Ast, replace: bool) -> Result<Ast, CacheError> {
        SyncAstCache::insert(self, ast, replace)
    }

    async fn retrieve(&self, name: &str) -> Option<Ast> {
        SyncAstCache::retrieve(self, name)
    }

    async fn remove(&self, name: &str) -> Option<bool> {
        SyncAstCache::remove(self, name)
    }

    async fn touch(&self, name: &str, touch: Touch) {
        SyncAstCache::touch(self, name, touch)
    }

    async fn count(&self) -> usize {
        SyncAstCache::count(self)
    }

    fn is_enabled(&self) -> bool {
        MemoryCache::is_enabled(self)
    }

    fn sync_interface(&self) -> Option<&dyn SyncAstCache> {
        Some(self)
    }
}
