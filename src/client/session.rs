//! Module `session`
//!
//! Defines the `Session` record holding the protocol state of one control
//! connection: login state, working directory, data-connection parameters,
//! the pending command bytes and the active transmission.

use crate::auth::AccountId;
use crate::platform::SocketHandle;
use crate::protocol::parser::LineBuffer;
use crate::transfer::Transmission;
use std::net::SocketAddrV4;

/// Index of a session slot in the [`SessionStore`](super::SessionStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub usize);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    control: SocketHandle,
    remote: SocketAddrV4,
    pub(crate) authenticated: bool,
    pub(crate) account: Option<AccountId>,
    pub(crate) working_dir: String,
    pub(crate) last_command: i64,
    pub(crate) passive: bool,
    pub(crate) binary: bool,
    pub(crate) rx: LineBuffer,
    pub(crate) passive_listener: Option<SocketHandle>,
    pub(crate) transmission: Transmission,
    /// Client port given by PORT
    pub(crate) remote_data_port: u16,
    /// Passive port registered with the port-forward hook
    pub(crate) forwarded_port: Option<u16>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        control: SocketHandle,
        remote: SocketAddrV4,
        now: i64,
        rx_buffer_size: usize,
    ) -> Self {
        Self {
            id,
            control,
            remote,
            authenticated: false,
            account: None,
            working_dir: "/".to_string(),
            last_command: now,
            passive: false,
            binary: true,
            rx: LineBuffer::new(rx_buffer_size),
            passive_listener: None,
            transmission: Transmission::Idle,
            remote_data_port: 0,
            forwarded_port: None,
        }
    }

    /// Marks the session as logged in and resets the working directory.
    pub fn authenticate(&mut self) {
        self.authenticated = true;
        self.working_dir = "/".to_string();
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn control_socket(&self) -> SocketHandle {
        self.control
    }

    pub fn remote(&self) -> SocketAddrV4 {
        self.remote
    }

    /// Logged in with an account that still exists.
    pub fn is_logged_in(&self) -> bool {
        self.authenticated && self.account.is_some()
    }

    pub fn account(&self) -> Option<AccountId> {
        self.account
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn last_command(&self) -> i64 {
        self.last_command
    }

    pub fn is_passive(&self) -> bool {
        self.passive
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn transmission(&self) -> &Transmission {
        &self.transmission
    }

    pub fn has_active_transmission(&self) -> bool {
        self.transmission.is_active()
    }
}
