use crate::media::AudioUpload;
use serde::{Deserialize, Serialize};

/// One named part and its notation source, in the order the analyzer
/// reported it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSource {
    pub name: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub instruments: Vec<String>,
    pub tempo: String,
    pub key_signature: String,
    pub parts: Vec<PartSource>,
    pub description: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Remote(String),
    #[error("malformed analysis payload: {0}")]
    Contract(String),
}

pub type AnalysisCallback = Box<dyn FnOnce(Result<AnalysisResult, AnalysisError>) + Send + 'static>;

pub trait AnalysisPort: Send + Sync {
    /// Transcribe an audio clip into named parts. Implementations may invoke
    /// `done` from a background thread.
    fn analyze(&self, upload: AudioUpload, done: AnalysisCallback);
}
