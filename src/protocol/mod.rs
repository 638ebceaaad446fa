//! FTP Protocol implementation
//!
//! Handles FTP command parsing, dispatch, and response generation.

pub mod commands;
pub mod dispatcher;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{COMMANDS, CommandSpec, CommandStatus, find_command};
pub use dispatcher::{dispatch, process_input};
pub use parser::LineBuffer;
