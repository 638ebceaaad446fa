//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Account registry errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account registry is full ({0} accounts)")]
    RegistryFull(usize),
    #[error("account name must not be empty")]
    EmptyName,
    #[error("account name exceeds {0} characters")]
    NameTooLong(usize),
    #[error("password for account {0} exceeds {1} characters")]
    PasswordTooLong(String, usize),
    #[error("root path for account {0} exceeds {1} characters")]
    RootTooLong(String, usize),
}

/// Path resolution and directory navigation errors
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("session has no account")]
    NoAccount,
    #[error("path exceeds {0} characters")]
    PathTooLong(usize),
    #[error("directory not found: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
}

/// Session store errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session table is full ({0} slots)")]
    TableFull(usize),
    #[error("unknown session {0}")]
    UnknownSession(usize),
}

/// Transfer module errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("a transmission is already active")]
    AlreadyActive,
    #[error("no data connection target (send PORT or PASV first)")]
    NoDataTarget,
    #[error("passive port for slot {0} is out of range")]
    PassivePortOutOfRange(usize),
    #[error("data connection failed: {0}")]
    DataConnection(#[from] io::Error),
    #[error("data connection from {0} rejected")]
    ClientRejected(SocketAddr),
}

impl TransferError {
    /// FTP reply code reported to the client for this failure.
    pub fn reply_code(&self) -> u16 {
        match self {
            TransferError::AlreadyActive => 450,
            _ => 425,
        }
    }
}

/// Top-level server errors
#[derive(Debug, Error)]
pub enum FtpServerError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("account error: {0}")]
    Auth(#[from] AuthError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server is not started")]
    NotStarted,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
