pub mod analysis;
pub mod export;
pub mod media;
pub mod render;
pub mod storage;
pub mod types;

pub use analysis::*;
pub use export::*;
pub use media::*;
pub use render::*;
pub use storage::*;
pub use types::*;
