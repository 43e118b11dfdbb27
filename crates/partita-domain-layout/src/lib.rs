pub mod document;
pub mod paginate;

pub use document::*;
pub use paginate::*;
