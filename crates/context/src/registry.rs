//! In-memory registry of loaded contexts.
//!
//! Readers get an `Arc<KnowledgeContext>` and drop the lock before doing any
//! work, so a concurrent reload never changes a policy mid-evaluation.

use crate::context::KnowledgeContext;
use crate::{ContextError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

type ContextMap = HashMap<String, Arc<KnowledgeContext>>;

/// Thread-safe set of contexts, keyed by name.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    dir: Option<PathBuf>,
    contexts: RwLock<ContextMap>,
}

impl ContextRegistry {
    /// Create an empty registry not backed by a directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` document in `dir`.
    pub fn load_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let contexts = read_dir(&dir)?;
        info!(dir = %dir.display(), count = contexts.len(), "Contexts loaded");
        Ok(Self {
            dir: Some(dir),
            contexts: RwLock::new(contexts),
        })
    }

    /// Re-read the backing directory and swap in the new set.
    ///
    /// All-or-nothing: if any document fails to load, the current set stays
    /// in place and the error is returned. Returns the number of contexts.
    pub fn reload(&self) -> Result<usize> {
        let Some(dir) = &self.dir else {
            debug!("Registry has no backing directory, nothing to reload");
            return Ok(self.len());
        };
        let contexts = read_dir(dir)?;
        let count = contexts.len();
        *self.write() = contexts;
        info!(dir = %dir.display(), count, "Contexts reloaded");
        Ok(count)
    }

    /// Add or replace a context. Returns the previous snapshot, if any.
    pub fn insert(&self, context: KnowledgeContext) -> Option<Arc<KnowledgeContext>> {
        self.write().insert(context.name.clone(), Arc::new(context))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<KnowledgeContext>> {
        self.write().remove(name)
    }

    /// Snapshot of one context.
    pub fn get(&self, name: &str) -> Option<Arc<KnowledgeContext>> {
        self.read().get(name).cloned()
    }

    /// Context names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, ContextMap> {
        self.contexts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContextMap> {
        self.contexts.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn read_dir(dir: &Path) -> Result<ContextMap> {
    let io_err = |source: std::io::Error| ContextError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut contexts = ContextMap::with_capacity(paths.len());
    for path in paths {
        let context = KnowledgeContext::load(&path)?;
        debug!(context = %context.name, path = %path.display(), "Context document loaded");
        contexts.insert(context.name.clone(), Arc::new(context));
    }
    Ok(contexts)
}
