//! Server core functionality
//!
//! The reactor loop that owns every session, and the per-dispatch context
//! it lends to handlers and the transmission engine.

pub mod context;
pub mod core;

pub use context::Context;
pub use core::Server;
