pub mod controller;
pub mod ipc;
pub mod session;

pub use controller::*;
pub use ipc::*;
pub use session::*;
