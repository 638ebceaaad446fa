//! Configuration management for the mini FTP server
//!
//! Settings come from built-in defaults, then an optional `config.toml`, then
//! `MINI_FTPD_*` environment variables (e.g. `MINI_FTPD_CONTROL_PORT=2121`).

use crate::auth::{AccessRights, AccountLimits, AccountRegistry, Right};
use crate::error::AuthError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IPv4 address the control listener and passive listeners bind to
    pub bind_address: Ipv4Addr,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// First passive port; session slot N listens on `passive_port_base + N`
    pub passive_port_base: u16,

    /// Address advertised in PASV replies to clients outside the local network
    pub external_address: Option<Ipv4Addr>,

    /// Clients allowed to connect; empty means everyone
    pub allowed_clients: Vec<Ipv4Addr>,

    // ═══ CAPACITY ═══
    /// Size of the session table
    pub max_sessions: usize,

    /// Size of the account registry
    pub max_accounts: usize,

    pub max_username_length: usize,
    pub max_password_length: usize,

    /// Longest server path a command may resolve to
    pub max_path_length: usize,

    /// Control-line buffer per session, CRLF included
    pub rx_buffer_size: usize,

    /// Bytes moved per transmission step
    pub transfer_chunk_size: usize,

    // ═══ TIMING ═══
    /// Idle time after which a session is closed with 421
    pub session_timeout_secs: u64,

    /// Poll timeout when no transfer is pending
    pub poll_interval_ms: u64,

    /// Bound on data-connection setup and on blocked sends
    pub data_connect_timeout_secs: u64,

    // ═══ PROTOCOL ═══
    /// Enables SIZE, MDTM, MLST and MLSD
    pub rfc3659: bool,

    pub accounts: Vec<AccountConfig>,
}

/// Account provisioned at startup
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default)]
    pub password: String,
    pub root: String,
    #[serde(default)]
    pub rights: Vec<Right>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            control_port: 2121,
            passive_port_base: 50000,
            external_address: None,
            allowed_clients: Vec::new(),
            max_sessions: 16,
            max_accounts: 10,
            max_username_length: 32,
            max_password_length: 32,
            max_path_length: 512,
            rx_buffer_size: 512,
            transfer_chunk_size: 8192,
            session_timeout_secs: 600,
            poll_interval_ms: 10,
            data_connect_timeout_secs: 10,
            rfc3659: true,
            accounts: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path` (extension optional) with environment overrides
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MINI_FTPD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 {
            return Err(config::ConfigError::Message(
                "control_port cannot be 0".into(),
            ));
        }

        if self.max_sessions == 0 {
            return Err(config::ConfigError::Message(
                "max_sessions must be greater than 0".into(),
            ));
        }

        if self.passive_port_base == 0 {
            return Err(config::ConfigError::Message(
                "passive_port_base cannot be 0".into(),
            ));
        }

        let last_passive_port = self.passive_port_base as usize + self.max_sessions - 1;
        if last_passive_port > u16::MAX as usize {
            return Err(config::ConfigError::Message(format!(
                "passive ports {}..={last_passive_port} exceed 65535",
                self.passive_port_base
            )));
        }

        if self.rx_buffer_size < 8 {
            return Err(config::ConfigError::Message(
                "rx_buffer_size must be at least 8".into(),
            ));
        }

        if self.transfer_chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "transfer_chunk_size must be greater than 0".into(),
            ));
        }

        if self.session_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "session_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.accounts.len() > self.max_accounts {
            return Err(config::ConfigError::Message(format!(
                "{} accounts configured but max_accounts is {}",
                self.accounts.len(),
                self.max_accounts
            )));
        }

        if let Some(account) = self.accounts.iter().find(|a| a.root.is_empty()) {
            return Err(config::ConfigError::Message(format!(
                "account {} has an empty root",
                account.name
            )));
        }

        Ok(())
    }

    /// Control listener address
    pub fn control_socket(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.bind_address, self.control_port)
    }

    pub fn session_timeout_secs(&self) -> i64 {
        i64::try_from(self.session_timeout_secs).unwrap_or(i64::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn data_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.data_connect_timeout_secs)
    }

    pub fn account_limits(&self) -> AccountLimits {
        AccountLimits {
            max_accounts: self.max_accounts,
            max_username_length: self.max_username_length,
            max_password_length: self.max_password_length,
            max_path_length: self.max_path_length,
        }
    }

    /// Builds the account registry from the configured accounts
    pub fn account_registry(&self) -> Result<AccountRegistry, AuthError> {
        let mut registry = AccountRegistry::new(self.account_limits());
        for account in &self.accounts {
            let rights: AccessRights = account.rights.iter().copied().collect();
            registry.create_account(&account.name, &account.password, &account.root, rights)?;
        }
        Ok(registry)
    }
}
