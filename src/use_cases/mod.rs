// Use cases layer: application workflows for the snake server.

pub mod game;
pub mod registry;
pub mod session;
pub mod types;

pub use registry::{SessionError, SessionRegistry};
pub use session::GameSession;
pub use types::{SessionEvent, SessionHandle, SessionSettings};
