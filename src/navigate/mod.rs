//! Navigate module
//!
//! Resolves client paths against the account root and handles directory
//! navigation for FTP sessions.

mod operations;
mod resolver;

// Re-export public types and functions
pub use operations::change_directory;
pub use resolver::{resolve, virtual_path};
