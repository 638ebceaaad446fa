//! Command dispatcher
//!
//! Takes complete lines out of a session's receive buffer, looks the verb up
//! in the command table and enforces login, rights and in-transfer policy
//! before running the handler.

use super::commands::{CommandStatus, find_command};
use super::parser::uppercase_verb;
use super::responses::{FILE_NOT_FOUND, NOT_LOGGED_IN, SYNTAX_ERROR};
use crate::client::Session;
use crate::server::Context;
use log::{debug, warn};

/// Dispatches at most one buffered line, or answers an overflowed buffer.
pub fn process_input(ctx: &mut Context<'_>, session: &mut Session) -> CommandStatus {
    if let Some(line) = session.rx.next_line() {
        return dispatch(ctx, session, &line);
    }

    if session.rx.overflowed() {
        warn!("Session {}: command line too long", session.id());
        session.rx.discard_overflow();
        ctx.reply(session, SYNTAX_ERROR, "Line too long.");
        return CommandStatus::Failure("line too long".into());
    }

    CommandStatus::Success
}

/// Executes one command line (without its CRLF).
pub fn dispatch(ctx: &mut Context<'_>, session: &mut Session, raw: &str) -> CommandStatus {
    let line = uppercase_verb(raw);

    let Some(spec) = find_command(&line, ctx.config.rfc3659) else {
        debug!("Session {}: unknown command", session.id());
        ctx.reply(session, SYNTAX_ERROR, raw);
        session.last_command = ctx.now();
        return CommandStatus::Failure("unknown command".into());
    };

    if spec.need_login {
        let Some(account) = session.account().filter(|_| session.is_logged_in()) else {
            ctx.reply(session, NOT_LOGGED_IN, "Please login with USER and PASS.");
            return CommandStatus::Failure("not logged in".into());
        };
        if !ctx.accounts.check_rights(account, spec.rights) {
            ctx.reply(session, FILE_NOT_FOUND, "Permission denied.");
            return CommandStatus::Failure("permission denied".into());
        }
    }

    if session.has_active_transmission() && !spec.during_transfer {
        debug!(
            "Session {}: {} ignored during transfer",
            session.id(),
            spec.verb
        );
        return CommandStatus::Success;
    }

    let args = line[spec.verb.len()..].trim_start_matches([' ', '\t']);
    debug!("Session {}: {}", session.id(), spec.verb);

    let status = (spec.handler)(ctx, session, args);
    session.last_command = ctx.now();
    status
}
