//! Session document caching and parsing
//!
//! Sources re-publish the full session YAML whenever the simulator bumps its
//! session info update counter. [`SessionDocumentParser`] parses each version
//! once and hands out the shared document for repeated requests.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use super::SessionDocument;
use crate::error::TelemetryError;

/// Cached document with version tracking
#[derive(Debug, Clone)]
pub struct SessionDocumentCache {
    /// Cached document
    pub document: Arc<SessionDocument>,
    /// Update counter when this was cached
    pub version: u32,
    /// Parse timestamp
    pub parsed_at: std::time::SystemTime,
}

impl SessionDocumentCache {
    pub fn new(document: Arc<SessionDocument>, version: u32) -> Self {
        Self { document, version, parsed_at: std::time::SystemTime::now() }
    }

    /// Check if cache is valid for given version
    pub fn is_valid(&self, current_version: u32) -> bool {
        self.version == current_version
    }
}

/// Session document parser with version caching
#[derive(Debug, Clone, Default)]
pub struct SessionDocumentParser {
    cache: Option<SessionDocumentCache>,
}

impl SessionDocumentParser {
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Parse YAML for a given update counter, reusing the cached document
    /// when the counter has not changed
    pub fn parse_versioned(&mut self, yaml: &str, version: u32) -> Result<Arc<SessionDocument>> {
        if let Some(cached) = &self.cache {
            if cached.is_valid(version) {
                debug!(version, "Using cached session document");
                return Ok(Arc::clone(&cached.document));
            }
        }

        debug!(version, length = yaml.len(), "Parsing fresh session document");

        let document = Arc::new(self.parse(yaml)?.with_version(version));
        self.cache = Some(SessionDocumentCache::new(Arc::clone(&document), version));
        Ok(document)
    }

    /// Parse YAML into a document and check it carries the sections the
    /// engine reads
    pub fn parse(&self, yaml: &str) -> Result<SessionDocument> {
        let document = SessionDocument::parse(yaml).context("Session YAML parsing failed")?;
        self.validate(&document)?;
        Ok(document)
    }

    /// Reject documents without a weekend or session section
    pub fn validate(&self, document: &SessionDocument) -> Result<()> {
        for section in ["WeekendInfo", "SessionInfo"] {
            if !document.query().get(section).exists() {
                return Err(TelemetryError::FieldNotFound { field: section.to_string() }.into());
            }
        }
        Ok(())
    }

    /// Get cached document if valid for version
    pub fn get_cached(&self, version: u32) -> Option<Arc<SessionDocument>> {
        self.cache
            .as_ref()
            .filter(|cache| cache.is_valid(version))
            .map(|cache| Arc::clone(&cache.document))
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }
}
