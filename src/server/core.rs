use log::{debug, error, info, warn};
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::auth::AccountRegistry;
use crate::client::{Session, SessionId, SessionStore};
use crate::config::ServerConfig;
use crate::error::FtpServerError;
use crate::platform::{
    Clock, ConfiguredHooks, FileSystem, LocalFileSystem, Network, ServerHooks, SocketHandle,
    SystemClock,
};
use crate::protocol::responses::{READY, SERVICE_CLOSING};
use crate::protocol::{CommandStatus, process_input};
use crate::server::Context;
use crate::transfer;

/// Single-threaded FTP server driving every session from one reactor loop.
pub struct Server {
    config: ServerConfig,
    accounts: AccountRegistry,
    sessions: SessionStore,
    net: Box<dyn Network>,
    fs: Box<dyn FileSystem>,
    clock: Box<dyn Clock>,
    hooks: Box<dyn ServerHooks>,
    listener: Option<SocketHandle>,
    scratch: Vec<u8>,
}

impl Server {
    /// Creates a server on real sockets and the local filesystem.
    #[cfg(unix)]
    pub fn new(config: ServerConfig, accounts: AccountRegistry) -> Self {
        let net = crate::platform::StdNetwork::new(config.data_connect_timeout());
        Self::with_network(config, accounts, Box::new(net))
    }

    /// Creates a server on the given network; the other collaborators
    /// default to the local filesystem, the system clock and hooks built
    /// from the configuration.
    pub fn with_network(
        config: ServerConfig,
        accounts: AccountRegistry,
        net: Box<dyn Network>,
    ) -> Self {
        let hooks = ConfiguredHooks::new(config.allowed_clients.clone(), config.external_address);
        Self {
            sessions: SessionStore::new(config.max_sessions, config.rx_buffer_size),
            scratch: vec![0; config.transfer_chunk_size],
            accounts,
            net,
            fs: Box::new(LocalFileSystem::new()),
            clock: Box::new(SystemClock),
            hooks: Box::new(hooks),
            listener: None,
            config,
        }
    }

    pub fn with_filesystem(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn ServerHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut AccountRegistry {
        &mut self.accounts
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Address the control listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddrV4> {
        self.listener
            .and_then(|listener| self.net.local_addr(listener).ok())
    }

    /// Binds the control listener.
    pub fn start(&mut self) -> Result<SocketAddrV4, FtpServerError> {
        let addr = self.config.control_socket();
        let listener = self.net.listen(addr).map_err(|source| FtpServerError::Bind {
            addr: SocketAddr::V4(addr),
            source,
        })?;
        self.listener = Some(listener);

        let bound = self.net.local_addr(listener).unwrap_or(addr);
        info!(
            "Server bound to {bound} (max {} sessions, passive ports from {})",
            self.config.max_sessions, self.config.passive_port_base
        );
        Ok(bound)
    }

    /// Runs the reactor until the process is stopped.
    pub fn run(&mut self) -> Result<(), FtpServerError> {
        if self.listener.is_none() {
            self.start()?;
        }
        loop {
            self.run_once()?;
        }
    }

    /// One reactor pass: step transfers, poll, accept, read and dispatch,
    /// then expire idle sessions.
    pub fn run_once(&mut self) -> Result<(), FtpServerError> {
        let listener = self.listener.ok_or(FtpServerError::NotStarted)?;
        let poll_interval = self.config.poll_interval();
        let session_timeout = self.config.session_timeout_secs();
        let (mut ctx, sessions) = self.split();

        // Transmissions opened during this pass wait for the next one.
        for id in sessions.active_transmission_ids() {
            if let Some(session) = sessions.get_mut(id) {
                transfer::step(&mut ctx, session);
            }
        }

        let mut watched = vec![listener];
        watched.extend(
            sessions
                .iter()
                .filter(|session| session.rx.spare() > 0)
                .map(Session::control_socket),
        );
        let busy = sessions.active_transmissions() > 0 || sessions.has_pending_lines();
        let timeout = if busy { Duration::ZERO } else { poll_interval };
        let ready = ctx.net.poll(&watched, timeout).unwrap_or_else(|e| {
            error!("Poll failed: {e}");
            Vec::new()
        });

        if ready.contains(&listener) {
            accept_connection(&mut ctx, sessions, listener);
        }

        for id in sessions.ids() {
            let Some(session) = sessions.get_mut(id) else {
                continue;
            };
            if ready.contains(&session.control_socket()) && !receive(&mut ctx, session) {
                sessions.close(id, &mut ctx);
                continue;
            }
            if process_input(&mut ctx, session) == CommandStatus::CloseConnection {
                sessions.close(id, &mut ctx);
            }
        }

        expire_idle_sessions(&mut ctx, sessions, session_timeout);
        Ok(())
    }

    /// Closes every session and the control listener.
    pub fn shutdown(&mut self) {
        let listener = self.listener.take();
        let (mut ctx, sessions) = self.split();
        for id in sessions.ids() {
            sessions.close(id, &mut ctx);
        }
        if let Some(listener) = listener {
            ctx.net.close(listener);
        }
        info!("Server shut down");
    }

    fn split(&mut self) -> (Context<'_>, &mut SessionStore) {
        let Server {
            config,
            accounts,
            sessions,
            net,
            fs,
            clock,
            hooks,
            scratch,
            ..
        } = self;
        let ctx = Context {
            config,
            accounts,
            net: &mut **net,
            fs: &mut **fs,
            clock: &**clock,
            hooks: &mut **hooks,
            scratch: scratch.as_mut_slice(),
        };
        (ctx, sessions)
    }
}

/// Accepts one pending control connection and greets it.
fn accept_connection(ctx: &mut Context<'_>, sessions: &mut SessionStore, listener: SocketHandle) {
    let (socket, peer) = match ctx.net.accept(listener, Duration::ZERO) {
        Ok(accepted) => accepted,
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            return;
        }
        Err(e) => {
            warn!("Error accepting connection: {e}");
            return;
        }
    };

    if !ctx.hooks.is_valid_client(*peer.ip()) {
        warn!("Connection from {peer} rejected");
        ctx.net.close(socket);
        return;
    }

    match sessions.open(socket, peer, ctx.now()) {
        Ok(id) => {
            info!(
                "Session {id} opened for {peer} ({}/{} sessions)",
                sessions.len(),
                sessions.capacity()
            );
            if let Some(session) = sessions.get(id) {
                ctx.reply(session, READY, "Welcome to mini-ftpd.");
            }
        }
        Err(e) => {
            warn!("Connection from {peer} refused: {e}");
            ctx.net.close(socket);
        }
    }
}

/// Reads available control bytes into the session's line buffer. Returns
/// false once the peer has gone.
fn receive(ctx: &mut Context<'_>, session: &mut Session) -> bool {
    let len = session.rx.spare().min(ctx.scratch.len());
    if len == 0 {
        return true;
    }

    match ctx.net.recv(session.control_socket(), &mut ctx.scratch[..len]) {
        Ok(0) => {
            info!("Session {} disconnected", session.id());
            false
        }
        Ok(n) => {
            let taken = session.rx.extend(&ctx.scratch[..n]);
            if taken < n {
                warn!(
                    "Session {}: dropped {} control bytes past the buffer",
                    session.id(),
                    n - taken
                );
            }
            true
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            true
        }
        Err(e) => {
            debug!("Session {}: control connection failed: {e}", session.id());
            false
        }
    }
}

fn expire_idle_sessions(ctx: &mut Context<'_>, sessions: &mut SessionStore, timeout_secs: i64) {
    let now = ctx.now();
    let idle: Vec<SessionId> = sessions
        .iter()
        .filter(|session| now - session.last_command() >= timeout_secs)
        .map(Session::id)
        .collect();

    for id in idle {
        if let Some(session) = sessions.get(id) {
            info!("Session {id} idle for {timeout_secs}s, closing");
            ctx.reply(session, SERVICE_CLOSING, "Timeout.");
        }
        sessions.close(id, ctx);
    }
}
