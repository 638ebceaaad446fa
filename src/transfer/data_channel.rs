//! Data channel setup
//!
//! Opens passive listeners and establishes the per-transfer data connection,
//! either by accepting on the passive listener or by connecting out to the
//! PORT target.

use crate::client::Session;
use crate::error::TransferError;
use crate::platform::SocketHandle;
use crate::server::Context;
use log::{debug, info, warn};
use std::net::{SocketAddr, SocketAddrV4};

/// Passive port of a session slot: `passive_port_base + slot`.
pub fn passive_port(base: u16, session: &Session) -> Result<u16, TransferError> {
    let slot = session.id().0;
    u16::try_from(base as usize + slot).map_err(|_| TransferError::PassivePortOutOfRange(slot))
}

/// Closes the session's passive listener and drops its port forward.
pub fn close_passive_listener(ctx: &mut Context<'_>, session: &mut Session) {
    if let Some(listener) = session.passive_listener.take() {
        ctx.net.close(listener);
    }
    if let Some(port) = session.forwarded_port.take() {
        ctx.hooks.remove_port_forward(port);
    }
}

/// Binds the session's passive listener and returns the address to
/// advertise to the client.
pub fn open_passive_listener(
    ctx: &mut Context<'_>,
    session: &mut Session,
) -> Result<SocketAddrV4, TransferError> {
    close_passive_listener(ctx, session);

    let port = passive_port(ctx.config.passive_port_base, session)?;
    let listener = ctx
        .net
        .listen(SocketAddrV4::new(ctx.config.bind_address, port))?;
    session.passive_listener = Some(listener);

    let client_ip = *session.remote().ip();
    let ip = match ctx.hooks.external_ip(client_ip) {
        Some(external) => {
            ctx.hooks.add_port_forward(port, port);
            session.forwarded_port = Some(port);
            external
        }
        None => ctx
            .net
            .local_addr(session.control_socket())
            .map(|addr| *addr.ip())
            .unwrap_or(ctx.config.bind_address),
    };

    debug!("Session {} listening for data on port {port}", session.id());
    Ok(SocketAddrV4::new(ip, port))
}

/// Establishes the data connection for one transfer.
pub fn establish(
    ctx: &mut Context<'_>,
    session: &mut Session,
) -> Result<SocketHandle, TransferError> {
    let timeout = ctx.config.data_connect_timeout();

    if session.is_passive() {
        let listener = session
            .passive_listener
            .ok_or(TransferError::NoDataTarget)?;
        let (socket, peer) = ctx.net.accept(listener, timeout)?;
        if !ctx.hooks.is_valid_client(*peer.ip()) {
            warn!("Session {}: data connection from {peer} rejected", session.id());
            ctx.net.close(socket);
            return Err(TransferError::ClientRejected(SocketAddr::V4(peer)));
        }
        info!("Session {}: passive data connection from {peer}", session.id());
        Ok(socket)
    } else {
        if session.remote_data_port == 0 {
            return Err(TransferError::NoDataTarget);
        }
        // Only the control connection's peer address is trusted.
        let target = SocketAddrV4::new(*session.remote().ip(), session.remote_data_port);
        let socket = ctx.net.connect(target, timeout)?;
        info!("Session {}: active data connection to {target}", session.id());
        Ok(socket)
    }
}
