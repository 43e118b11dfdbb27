use serde::{Deserialize, Serialize};
use std::path::Path;

/// An audio recording read into memory, ready to hand to an analyzer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    #[error("read failed: {0}")]
    Read(String),
    #[error("unsupported media type: {0}")]
    UnsupportedFormat(String),
}

pub type MediaCallback = Box<dyn FnOnce(Result<AudioUpload, MediaError>) + Send + 'static>;

pub trait AudioSourcePort: Send + Sync {
    /// Read the file behind `path`. Implementations may invoke `done` from a
    /// background thread.
    fn read(&self, path: &Path, done: MediaCallback);
}
