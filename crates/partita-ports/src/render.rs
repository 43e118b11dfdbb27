use crate::types::SurfaceId;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("render backend failed: {0}")]
    Backend(String),
    #[error("render io failed: {0}")]
    Io(String),
}

pub type RenderCallback = Box<dyn FnOnce(Result<(), RenderError>) + Send + 'static>;

pub trait RenderPort: Send + Sync {
    /// Paint notation source onto `surface`. The semitone offset is applied
    /// at render time; the source text is passed through untouched.
    /// Implementations may invoke `done` from a background thread.
    fn render(
        &self,
        surface: &SurfaceId,
        source: &str,
        transpose_semitones: i32,
        done: RenderCallback,
    );
}
