//! Source documents handed over by the generation collaborator

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Raw text of one generated component.
///
/// Never mutated: an edit produces a new document, so a render of the old one
/// can finish without seeing partial edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    text: Arc<str>,
    derived_at: DateTime<Utc>,
}

impl SourceDocument {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            derived_at: Utc::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn derived_at(&self) -> DateTime<Utc> {
        self.derived_at
    }
}

impl From<&str> for SourceDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
