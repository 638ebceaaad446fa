//! Dispatch context
//!
//! Borrowed view of the server handed to command handlers and the
//! transmission engine for the duration of one call.

use crate::auth::AccountRegistry;
use crate::client::Session;
use crate::config::ServerConfig;
use crate::error::NavigateError;
use crate::navigate;
use crate::platform::{Clock, FileSystem, Network, ServerHooks};
use crate::protocol::responses::{format_quoted, format_response};
use log::debug;

pub struct Context<'a> {
    pub config: &'a ServerConfig,
    pub accounts: &'a AccountRegistry,
    pub net: &'a mut dyn Network,
    pub fs: &'a mut dyn FileSystem,
    pub clock: &'a dyn Clock,
    pub hooks: &'a mut dyn ServerHooks,
    /// Transfer buffer shared by every transmission step
    pub scratch: &'a mut [u8],
}

impl Context<'_> {
    /// Sends raw reply text on the session's control connection. A failed
    /// send is left for the reactor to notice on the next read.
    pub fn send_text(&mut self, session: &Session, text: &str) {
        if let Err(e) = self.net.send(session.control_socket(), text.as_bytes()) {
            debug!("Reply to session {} failed: {e}", session.id());
        }
    }

    pub fn reply(&mut self, session: &Session, code: u16, message: &str) {
        self.send_text(session, &format_response(code, message));
    }

    pub fn reply_quoted(&mut self, session: &Session, code: u16, message: &str) {
        self.send_text(session, &format_quoted(code, message));
    }

    pub fn now(&self) -> i64 {
        self.clock.unix_time()
    }

    pub fn account_root(&self, session: &Session) -> Result<&str, NavigateError> {
        session
            .account()
            .and_then(|id| self.accounts.root(id))
            .ok_or(NavigateError::NoAccount)
    }

    pub fn account_name(&self, session: &Session) -> Option<&str> {
        session
            .account()
            .and_then(|id| self.accounts.get(id))
            .map(|account| account.name.as_str())
    }

    /// Resolves a client path for this session, enforcing the path length cap.
    pub fn resolve(
        &self,
        session: &Session,
        path: &str,
        normalize: bool,
    ) -> Result<String, NavigateError> {
        let root = self.account_root(session)?;
        let resolved = navigate::resolve(root, session.working_dir(), path, normalize);
        if resolved.len() > self.config.max_path_length {
            return Err(NavigateError::PathTooLong(self.config.max_path_length));
        }
        Ok(resolved)
    }
}
