//! mini-ftpd - Entry Point
//!
//! A small single-threaded FTP server implementing the core of RFC 959 and
//! the RFC 3659 listing extensions.

use log::{error, info};
#[cfg(unix)]
use mini_ftpd::Server;
use mini_ftpd::{FtpServerError, ServerConfig};

fn main() {
    // RUST_LOG overrides the default filter
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Launching FTP server...");

    if let Err(e) = run() {
        error!("Server startup failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(unix)]
fn run() -> Result<(), FtpServerError> {
    let config = ServerConfig::load("config")?;
    let accounts = config.account_registry()?;
    info!("Loaded {} account(s)", accounts.len());

    let mut server = Server::new(config, accounts);
    server.start()?;
    server.run()
}

/// Only the unix socket backend exists; embedders on other targets supply
/// their own `Network` through `Server::with_network`.
#[cfg(not(unix))]
fn run() -> Result<(), FtpServerError> {
    ServerConfig::load("config")?;
    Err(FtpServerError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no socket backend for this platform",
    )))
}
