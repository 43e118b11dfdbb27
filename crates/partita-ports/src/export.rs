use crate::types::SurfaceId;
use serde::{Deserialize, Serialize};

/// Pixel capture of a rendered surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterImage {
    pub width_px: u32,
    pub height_px: u32,
    pub png: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("export backend failed: {0}")]
    Backend(String),
    #[error("export io failed: {0}")]
    Io(String),
}

pub type CaptureCallback = Box<dyn FnOnce(Result<RasterImage, ExportError>) + Send + 'static>;

pub trait ExportPort: Send + Sync {
    /// Capture the current pixels of `surface`. Implementations may invoke
    /// `done` from a background thread.
    fn capture(&self, surface: &SurfaceId, done: CaptureCallback);
}
