//! Client session management
//!
//! Per-connection session records and the fixed-capacity store holding them.

pub mod registry;
pub mod session;

pub use registry::SessionStore;
pub use session::{Session, SessionId};
