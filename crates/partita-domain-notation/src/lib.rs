pub mod parts;
pub mod transpose;

pub use parts::*;
pub use transpose::*;
