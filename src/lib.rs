pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod navigate;
pub mod platform;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use crate::config::ServerConfig;
pub use error::FtpServerError;
pub use server::Server;
