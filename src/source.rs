//! Named template sources and the search order across them.
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    ast::{AstKey, DEFAULT_SOURCE},
    error::{RenderError, SourceError},
};

/// A provider of template bytes, addressed by path.
#[async_trait]
pub trait Source: Send + Sync {
    /// Read the bytes for `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// Name-indexed registry of sources.
///
/// Keys with an explicit source resolve against that source only;
/// default-scope keys walk the sources in registration order.
#[derive(Clone, Default)]
pub struct SourceSet {
    order: Vec<String>,
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceSet {
    /// An empty source set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Register a source under `name`.
    ///
    /// Names may not contain `:` and may not start with `$` other
    /// than the bare default scope name.
    pub fn register(
        &mut self,
        name: &str,
        source: Arc<dyn Source>,
    ) -> Result<(), RenderError> {
        if name.is_empty()
            || name.contains(':')
            || (name.starts_with('$') && name != DEFAULT_SOURCE)
        {
            return Err(RenderError::IllegalAccess(name.to_string()));
        }
        if !self.sources.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.sources.insert(name.to_string(), source);
        Ok(())
    }

    /// Register a source as the default scope.
    pub fn register_default(
        &mut self,
        source: Arc<dyn Source>,
    ) -> Result<(), RenderError> {
        self.register(DEFAULT_SOURCE, source)
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolve `key` to the name of the source that held it and the
    /// template bytes.
    pub async fn find(
        &self,
        key: &AstKey,
    ) -> Result<(String, Vec<u8>), RenderError> {
        if !key.is_default_scope() {
            let source = self.sources.get(key.source()).ok_or_else(|| {
                RenderError::NoTemplateExists(key.name())
            })?;
            let bytes = read_one(source, key.path(), &key.name()).await?;
            return Ok((key.source().to_string(), bytes));
        }

        for name in &self.order {
            let source = &self.sources[name];
            match source.read(key.path()).await {
                Ok(bytes) => {
                    debug!("template '{}' found in source '{}'", key, name);
                    return Ok((name.clone(), bytes));
                }
                Err(SourceError::NotFound(_)) => continue,
                Err(SourceError::IllegalPath(path)) => {
                    return Err(RenderError::IllegalAccess(path))
                }
                Err(err) => return Err(RenderError::Source(err)),
            }
        }
        Err(RenderError::NoTemplateExists(key.name()))
    }
}

async fn read_one(
    source: &Arc<dyn Source>,
    path: &str,
    name: &str,
) -> Result<Vec<u8>, RenderError> {
    match source.read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(SourceError::NotFound(_)) => {
            Err(RenderError::NoTemplateExists(name.to_string()))
        }
        Err(SourceError::IllegalPath(path)) => {
            Err(RenderError::IllegalAccess(path))
        }
        Err(err) => Err(RenderError::Source(err)),
    }
}

/// In-memory source, mostly useful for tests and documentation.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    templates: HashMap<String, String>,
}

impl MemorySource {
    /// An empty source.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a template body.
    pub fn insert(&mut self, path: &str, body: &str) {
        self.templates.insert(path.to_string(), body.to_string());
    }

    /// Add a template body, builder style.
    pub fn with(mut self, path: &str, body: &str) -> Self {
        self.insert(path, body);
        self
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.templates
            .get(path)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }
}

/// Filesystem source rooted at a directory.
///
/// Template paths map to `<root>/<path>.<extension>`; paths that
/// try to climb out of the root are rejected.
#[cfg(feature = "fs")]
pub struct FileSource {
    root: std::path::PathBuf,
    extension: String,
}

#[cfg(feature = "fs")]
impl FileSource {
    /// A source reading files under `root` with `extension`.
    pub fn new<P: Into<std::path::PathBuf>>(root: P, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
        }
    }
}

#[cfg(feature = "fs")]
#[async_trait]
impl Source for FileSource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        use std::path::Component;

        let relative = std::path::Path::new(path);
        let escapes = relative.components().any(|part| {
            !matches!(part, Component::Normal(_) | Component::CurDir)
        });
        if escapes {
            return Err(SourceError::IllegalPath(path.to_string()));
        }

        let file = self
            .root
            .join(relative)
            .with_extension(&self.extension);
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(path.to_string()))
            }
            Err(err) => Err(SourceError::from(err)),
        }
    }
}
