//! Collaborators owned by the caller and consulted by the pipeline.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::Result;

/// Source-credibility lookup that may add a short trailing line to a summary.
///
/// Failures are logged by the pipeline and otherwise ignored.
#[async_trait]
pub trait SourceLookup: Send + Sync {
    async fn find_source(&self, name_or_domain: &str) -> Result<Option<String>>;
}

/// Resolves keys of the bot's own link-shortcut service to the original URL.
#[async_trait]
pub trait ShortcutResolver: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<Option<String>>;
}

/// Lookup that never knows anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSourceLookup;

#[async_trait]
impl SourceLookup for NoSourceLookup {
    async fn find_source(&self, _name_or_domain: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Resolver with no shortcuts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShortcuts;

#[async_trait]
impl ShortcutResolver for NoShortcuts {
    async fn resolve(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// In-memory source table keyed by root domain.
#[derive(Debug, Default, Clone)]
pub struct StaticSources {
    entries: HashMap<String, String>,
}

impl StaticSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: impl Into<String>, line: impl Into<String>) -> Self {
        self.entries.insert(domain.into().to_lowercase(), line.into());
        self
    }
}

#[async_trait]
impl SourceLookup for StaticSources {
    async fn find_source(&self, name_or_domain: &str) -> Result<Option<String>> {
        Ok(self.entries.get(&name_or_domain.to_lowercase()).cloned())
    }
}

/// In-memory shortcut table.
#[derive(Debug, Default, Clone)]
pub struct StaticShortcuts {
    entries: HashMap<String, String>,
}

impl StaticShortcuts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, url: impl Into<String>) -> Self {
        self.entries.insert(key.into(), url.into());
        self
    }
}

#[async_trait]
impl ShortcutResolver for StaticShortcuts {
    async fn resolve(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }
}
