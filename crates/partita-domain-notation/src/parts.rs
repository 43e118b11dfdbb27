use partita_ports::analysis::PartSource;
use serde::{Deserialize, Serialize};

/// The part the analyzer is asked to always include. Selected by default
/// when present.
pub const FULL_SCORE: &str = "Full Score";

#[derive(thiserror::Error, Debug)]
pub enum NotationError {
    #[error("analysis produced no parts")]
    EmptyResult,
    #[error("unknown part: {0}")]
    UnknownPart(String),
}

/// Named parts in analyzer document order. Never empty: a result without
/// parts is rejected at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartBook {
    parts: Vec<PartSource>,
}

impl PartBook {
    /// Duplicate names keep the first occurrence.
    pub fn new(parts: Vec<PartSource>) -> Result<Self, NotationError> {
        if parts.is_empty() {
            return Err(NotationError::EmptyResult);
        }
        let mut deduped: Vec<PartSource> = Vec::with_capacity(parts.len());
        for part in parts {
            if !deduped.iter().any(|p| p.name == part.name) {
                deduped.push(part);
            }
        }
        Ok(Self { parts: deduped })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.source.as_str())
    }

    /// "Full Score" when the analyzer provided one, otherwise the first part.
    pub fn default_part(&self) -> &str {
        if self.contains(FULL_SCORE) {
            FULL_SCORE
        } else {
            &self.parts[0].name
        }
    }
}
