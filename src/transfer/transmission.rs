//! Transmission engine
//!
//! Moves RETR and STOR data one bounded chunk per reactor pass. The engine
//! sends the final reply itself because the handler that opened the
//! transmission has long since returned.

use crate::client::Session;
use crate::error::TransferError;
use crate::platform::{FileHandle, SocketHandle};
use crate::protocol::responses::{LOCAL_ERROR, TRANSFER_ABORTED, TRANSFER_COMPLETE};
use crate::server::Context;
use log::{info, warn};
use std::io;

/// Data transfer owned by a session. Each variant owns exactly the handles
/// it needs; they are released by [`close`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    #[default]
    Idle,
    Retrieving {
        file: FileHandle,
        socket: SocketHandle,
        remaining: u64,
    },
    Storing {
        file: FileHandle,
        socket: SocketHandle,
    },
}

impl Transmission {
    pub fn is_active(&self) -> bool {
        !matches!(self, Transmission::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Pending,
    Finished,
}

/// Starts a transmission on an idle session.
pub fn open(session: &mut Session, transmission: Transmission) -> Result<(), TransferError> {
    if session.transmission.is_active() {
        return Err(TransferError::AlreadyActive);
    }
    session.transmission = transmission;
    Ok(())
}

/// Releases the data socket and file of the session's transmission, if any.
pub fn close(ctx: &mut Context<'_>, session: &mut Session) {
    match std::mem::take(&mut session.transmission) {
        Transmission::Idle => {}
        Transmission::Retrieving { file, socket, .. } | Transmission::Storing { file, socket } => {
            ctx.net.close(socket);
            ctx.fs.close(file);
        }
    }
}

/// Advances the session's transmission by at most one scratch buffer.
pub fn step(ctx: &mut Context<'_>, session: &mut Session) -> StepOutcome {
    session.last_command = ctx.now();

    let transmission = session.transmission;
    let outcome = match transmission {
        Transmission::Idle => return StepOutcome::Finished,
        Transmission::Retrieving {
            file,
            socket,
            remaining,
        } => step_retrieve(ctx, session, file, socket, remaining),
        Transmission::Storing { file, socket } => step_store(ctx, session, file, socket),
    };

    if outcome == StepOutcome::Finished {
        close(ctx, session);
    }
    outcome
}

fn step_retrieve(
    ctx: &mut Context<'_>,
    session: &mut Session,
    file: FileHandle,
    socket: SocketHandle,
    remaining: u64,
) -> StepOutcome {
    if remaining == 0 {
        ctx.reply(session, TRANSFER_COMPLETE, "Transfer complete.");
        return StepOutcome::Finished;
    }

    let want = ctx.scratch.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
    let read = match ctx.fs.read(file, &mut ctx.scratch[..want]) {
        Ok(0) => {
            warn!("Session {}: file ended {remaining} bytes early", session.id());
            ctx.reply(session, LOCAL_ERROR, "Error reading file.");
            return StepOutcome::Finished;
        }
        Ok(n) => n,
        Err(e) => {
            warn!("Session {}: file read failed: {e}", session.id());
            ctx.reply(session, LOCAL_ERROR, "Error reading file.");
            return StepOutcome::Finished;
        }
    };

    if let Err(e) = ctx.net.send(socket, &ctx.scratch[..read]) {
        warn!("Session {}: data connection lost: {e}", session.id());
        ctx.reply(session, TRANSFER_ABORTED, "Data connection error.");
        return StepOutcome::Finished;
    }

    let remaining = remaining - read as u64;
    session.transmission = Transmission::Retrieving {
        file,
        socket,
        remaining,
    };

    if remaining == 0 {
        info!("Session {}: download complete", session.id());
        ctx.reply(session, TRANSFER_COMPLETE, "Transfer complete.");
        return StepOutcome::Finished;
    }
    StepOutcome::Pending
}

fn step_store(
    ctx: &mut Context<'_>,
    session: &mut Session,
    file: FileHandle,
    socket: SocketHandle,
) -> StepOutcome {
    let mut filled = 0;
    // None while the peer may still send; Some once the stream ended.
    let mut end: Option<io::Result<()>> = None;

    while filled < ctx.scratch.len() {
        match ctx.net.recv(socket, &mut ctx.scratch[filled..]) {
            Ok(0) => {
                end = Some(Ok(()));
                break;
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                end = Some(Err(e));
                break;
            }
        }
    }

    if filled > 0 {
        if let Err(e) = ctx.fs.write(file, &ctx.scratch[..filled]) {
            warn!("Session {}: file write failed: {e}", session.id());
            ctx.reply(session, LOCAL_ERROR, "Error writing file.");
            return StepOutcome::Finished;
        }
    }

    match end {
        None => StepOutcome::Pending,
        Some(Ok(())) => {
            info!("Session {}: upload complete", session.id());
            ctx.reply(session, TRANSFER_COMPLETE, "Transfer complete.");
            StepOutcome::Finished
        }
        Some(Err(e)) => {
            warn!("Session {}: upload connection reset: {e}", session.id());
            ctx.reply(session, TRANSFER_ABORTED, "Connection closed; transfer aborted.");
            StepOutcome::Finished
        }
    }
}
