//! Session store
//!
//! Fixed-capacity table of sessions indexed by slot id. The slot id doubles
//! as the offset of the session's passive port.

use super::session::{Session, SessionId};
use crate::error::SessionError;
use crate::platform::SocketHandle;
use crate::server::Context;
use crate::transfer;
use log::info;
use std::net::SocketAddrV4;

pub struct SessionStore {
    slots: Vec<Option<Session>>,
    rx_buffer_size: usize,
}

impl SessionStore {
    pub fn new(capacity: usize, rx_buffer_size: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            rx_buffer_size,
        }
    }

    /// Opens a session in the first free slot.
    pub fn open(
        &mut self,
        control: SocketHandle,
        remote: SocketAddrV4,
        now: i64,
    ) -> Result<SessionId, SessionError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SessionError::TableFull(self.slots.len()))?;
        let id = SessionId(index);
        self.slots[index] = Some(Session::new(
            id,
            control,
            remote,
            now,
            self.rx_buffer_size,
        ));
        Ok(id)
    }

    pub fn authenticate(&mut self, id: SessionId) -> Result<(), SessionError> {
        self.get_mut(id)
            .ok_or(SessionError::UnknownSession(id.0))?
            .authenticate();
        Ok(())
    }

    /// Closes a session: its control socket, any transmission and its passive
    /// listener. Closing a free slot does nothing.
    pub fn close(&mut self, id: SessionId, ctx: &mut Context<'_>) -> bool {
        let Some(mut session) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return false;
        };

        transfer::close(ctx, &mut session);
        transfer::close_passive_listener(ctx, &mut session);
        ctx.net.close(session.control_socket());
        info!("Session {id} from {} closed", session.remote());
        true
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.slots.iter().flatten()
    }

    /// Ids of every open session, in slot order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.iter().map(Session::id).collect()
    }

    /// Ids of sessions with a transmission in progress.
    pub fn active_transmission_ids(&self) -> Vec<SessionId> {
        self.iter()
            .filter(|session| session.has_active_transmission())
            .map(Session::id)
            .collect()
    }

    /// Number of transmissions in progress across all sessions.
    pub fn active_transmissions(&self) -> usize {
        self.iter()
            .filter(|session| session.has_active_transmission())
            .count()
    }

    /// Some session already holds a complete command line.
    pub fn has_pending_lines(&self) -> bool {
        self.iter().any(|session| session.rx.has_line())
    }

    pub fn find_by_control(&self, socket: SocketHandle) -> Option<SessionId> {
        self.iter()
            .find(|session| session.control_socket() == socket)
            .map(Session::id)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
