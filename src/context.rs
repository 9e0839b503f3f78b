// 📚 Regulatory Context - Static corpus embedded in every prompt
// Loaded once at startup, read-only afterwards

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Default location of the corpus, relative to the working directory
pub const DEFAULT_CORPUS_PATH: &str = "rag_corpus.txt";

/// Immutable regulatory text shared by all requests.
///
/// Cloning is cheap; every clone points at the same buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegulatoryContext {
    text: Arc<str>,
}

impl Default for RegulatoryContext {
    fn default() -> Self {
        RegulatoryContext { text: Arc::from("") }
    }
}

impl RegulatoryContext {
    pub fn new(text: impl Into<String>) -> Self {
        RegulatoryContext {
            text: Arc::from(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the corpus from disk.
    ///
    /// A missing or unreadable file yields an empty context so the service
    /// can still start.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                info!(path = %path.display(), bytes = text.len(), "regulatory context loaded");
                Self::new(text)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "regulatory context unavailable, using empty context");
                Self::empty()
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }
}
