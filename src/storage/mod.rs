//! Storage module
//!
//! Directory listing formats served over data connections.

pub mod listing;

pub use listing::{ListFormat, format_facts, format_list_line, send_listing};
