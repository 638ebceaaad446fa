//! Command handlers module for the mini FTP server.
//!
//! One handler per FTP verb. Handlers reply on the control connection
//! themselves; the returned status only tells the dispatcher whether the
//! command succeeded and whether the session must close.

use super::commands::{CommandStatus, feature_verbs};
use super::responses::*;
use crate::client::Session;
use crate::navigate::{change_directory, virtual_path};
use crate::platform::{FileKind, OpenMode};
use crate::server::Context;
use crate::storage::{ListFormat, format_facts, send_listing};
use crate::transfer::{self, Transmission};
use log::{info, warn};

/// Replies with an error and returns the matching failure status.
fn fail(ctx: &mut Context<'_>, session: &Session, code: u16, message: &str) -> CommandStatus {
    ctx.reply(session, code, message);
    CommandStatus::Failure(message.to_string())
}

/// Resolves `path` for the session, replying 550 if it cannot be resolved.
fn real_path(
    ctx: &mut Context<'_>,
    session: &Session,
    path: &str,
) -> Result<String, CommandStatus> {
    ctx.resolve(session, path, true).map_err(|e| {
        warn!("Session {}: {e}", session.id());
        fail(ctx, session, FILE_NOT_FOUND, "Invalid path.")
    })
}

/// Handles the USER command: remembers the account for the following PASS.
///
/// Unknown names are not revealed; PASS simply fails afterwards.
pub fn handle_cmd_user(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    session.authenticated = false;
    session.account = ctx.accounts.find_account(args);
    ctx.reply(session, PASSWORD_REQUIRED, "Please specify the password.");
    CommandStatus::Success
}

/// Handles the PASS command: logs the session in if the password matches.
pub fn handle_cmd_pass(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    match session.account() {
        Some(id) if ctx.accounts.check_password(id, args) => {
            session.authenticate();
            info!(
                "Session {}: {} logged in from {}",
                session.id(),
                ctx.account_name(session).unwrap_or_default(),
                session.remote()
            );
            ctx.reply(session, LOGIN_SUCCESS, "Login successful.");
            CommandStatus::Success
        }
        _ => {
            session.account = None;
            warn!("Session {}: login failed from {}", session.id(), session.remote());
            fail(ctx, session, NOT_LOGGED_IN, "Login incorrect.")
        }
    }
}

pub fn handle_cmd_syst(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    ctx.reply(session, SYSTEM_TYPE, "UNIX Type: L8");
    CommandStatus::Success
}

pub fn handle_cmd_noop(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    ctx.reply(session, OK, "NOOP ok.");
    CommandStatus::Success
}

/// Handles the QUIT command: says goodbye and signals connection close.
pub fn handle_cmd_quit(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    ctx.reply(session, GOODBYE, "Goodbye.");
    CommandStatus::CloseConnection
}

/// Handles the ABOR command: tears down any transmission unconditionally.
pub fn handle_cmd_abor(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    if session.has_active_transmission() {
        info!("Session {}: transfer aborted by client", session.id());
    }
    transfer::close(ctx, session);
    ctx.reply(session, TRANSFER_COMPLETE, "ABOR successful.");
    CommandStatus::Success
}

/// Handles the FEAT command: lists the extension commands in the table.
pub fn handle_cmd_feat(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    let features: Vec<String> = feature_verbs(ctx.config.rfc3659)
        .map(|verb| match verb {
            "MLST" => "MLST type*;size*;modify*;perm*".to_string(),
            other => other.to_string(),
        })
        .collect();
    let text = format_multiline(FEATURES, "Features:", &features, "End");
    ctx.send_text(session, &text);
    CommandStatus::Success
}

/// Parses `h1,h2,h3,h4,p1,p2` into the port it names.
fn parse_port_argument(args: &str) -> Option<u16> {
    let fields = args
        .trim()
        .split(',')
        .map(|field| field.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .ok()?;
    if fields.len() != 6 {
        return None;
    }
    let port = (u16::from(fields[4]) << 8) | u16::from(fields[5]);
    (port != 0).then_some(port)
}

/// Handles the PORT command: records the client's data port for active mode.
///
/// The host octets are ignored; data connections always go to the control
/// connection's peer.
pub fn handle_cmd_port(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let Some(port) = parse_port_argument(args) else {
        return fail(ctx, session, BAD_PARAMETER, "Illegal PORT command.");
    };

    transfer::close_passive_listener(ctx, session);
    session.remote_data_port = port;
    session.passive = false;
    ctx.reply(session, OK, "PORT command successful. Consider using PASV.");
    CommandStatus::Success
}

/// Handles the PASV command: opens the slot's passive listener.
pub fn handle_cmd_pasv(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    match transfer::open_passive_listener(ctx, session) {
        Ok(addr) => {
            session.passive = true;
            ctx.reply(session, PASSIVE_MODE, &passive_address(*addr.ip(), addr.port()));
            CommandStatus::Success
        }
        Err(e) => {
            warn!("Session {}: PASV failed: {e}", session.id());
            fail(ctx, session, e.reply_code(), "Cannot open passive connection.")
        }
    }
}

/// Shared LIST/NLST/MLSD flow: the working directory is sent over a fresh
/// data connection. Arguments such as `-la` are ignored.
fn list_working_dir(ctx: &mut Context<'_>, session: &mut Session, format: ListFormat) -> CommandStatus {
    let working_dir = session.working_dir().to_string();
    let path = match real_path(ctx, session, &working_dir) {
        Ok(path) => path,
        Err(status) => return status,
    };

    let socket = match transfer::establish(ctx, session) {
        Ok(socket) => socket,
        Err(e) => {
            warn!("Session {}: {e}", session.id());
            return fail(ctx, session, e.reply_code(), "Cannot open data connection.");
        }
    };

    send_listing(ctx, session, socket, &path, format);
    ctx.net.close(socket);
    CommandStatus::Success
}

pub fn handle_cmd_list(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    list_working_dir(ctx, session, ListFormat::List)
}

pub fn handle_cmd_nlst(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    list_working_dir(ctx, session, ListFormat::Nlst)
}

pub fn handle_cmd_mlsd(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    list_working_dir(ctx, session, ListFormat::Mlsd)
}

/// Handles the RETR command: starts a download transmission.
pub fn handle_cmd_retr(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };

    let size = match ctx.fs.stat(&path) {
        Ok(info) if info.kind == FileKind::File => info.size,
        _ => return fail(ctx, session, FILE_NOT_FOUND, "Failed to open file."),
    };

    let account = ctx.account_name(session).unwrap_or_default().to_string();
    if !ctx.hooks.may_retrieve(*session.remote().ip(), &account, &path) {
        info!("Session {}: download of {path} refused", session.id());
        return fail(ctx, session, FILE_NOT_FOUND, "Failed to open file.");
    }

    let socket = match transfer::establish(ctx, session) {
        Ok(socket) => socket,
        Err(e) => {
            warn!("Session {}: {e}", session.id());
            return fail(ctx, session, e.reply_code(), "Cannot open data connection.");
        }
    };

    let mode = if session.is_binary() { "BINARY" } else { "ASCII" };
    ctx.reply(
        session,
        OPENING_DATA,
        &format!("Opening {mode} mode data connection for {args} ({size} bytes)."),
    );

    let file = match ctx.fs.open(&path, OpenMode::Read) {
        Ok(file) => file,
        Err(e) => {
            warn!("Session {}: cannot open {path}: {e}", session.id());
            ctx.net.close(socket);
            return fail(ctx, session, LOCAL_ERROR, "Cannot open file.");
        }
    };

    start_transmission(
        ctx,
        session,
        Transmission::Retrieving {
            file,
            socket,
            remaining: size,
        },
    )
}

/// Handles the STOR command: starts an upload transmission.
pub fn handle_cmd_stor(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };

    let socket = match transfer::establish(ctx, session) {
        Ok(socket) => socket,
        Err(e) => {
            warn!("Session {}: {e}", session.id());
            return fail(ctx, session, e.reply_code(), "Cannot open data connection.");
        }
    };

    ctx.reply(session, OPENING_DATA, "Ok to send data.");

    let file = match ctx.fs.open(&path, OpenMode::Write) {
        Ok(file) => file,
        Err(e) => {
            warn!("Session {}: cannot create {path}: {e}", session.id());
            ctx.net.close(socket);
            return fail(ctx, session, LOCAL_ERROR, "Cannot create file.");
        }
    };

    start_transmission(ctx, session, Transmission::Storing { file, socket })
}

/// Registers a transmission and runs its first step right away.
fn start_transmission(
    ctx: &mut Context<'_>,
    session: &mut Session,
    transmission: Transmission,
) -> CommandStatus {
    if let Err(e) = transfer::open(session, transmission) {
        // The dispatcher never lets a second transfer command through.
        if let Transmission::Retrieving { file, socket, .. } | Transmission::Storing { file, socket } =
            transmission
        {
            ctx.net.close(socket);
            ctx.fs.close(file);
        }
        return fail(ctx, session, e.reply_code(), "Transfer already in progress.");
    }

    info!("Session {}: transfer started", session.id());
    transfer::step(ctx, session);
    CommandStatus::Success
}

pub fn handle_cmd_dele(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };
    match ctx.fs.remove_file(&path) {
        Ok(()) => {
            ctx.reply(session, FILE_ACTION_OK, "Delete operation successful.");
            CommandStatus::Success
        }
        Err(_) => fail(ctx, session, FILE_UNAVAILABLE, "Delete operation failed."),
    }
}

pub fn handle_cmd_mkd(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };
    match ctx.fs.make_dir(&path) {
        Ok(()) => {
            ctx.reply(session, FILE_ACTION_OK, "Directory created.");
            CommandStatus::Success
        }
        Err(_) => fail(ctx, session, FILE_NOT_FOUND, "Create directory operation failed."),
    }
}

pub fn handle_cmd_rmd(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };
    match ctx.fs.remove_dir(&path) {
        Ok(()) => {
            ctx.reply(session, FILE_ACTION_OK, "Directory removed.");
            CommandStatus::Success
        }
        Err(_) => fail(ctx, session, FILE_NOT_FOUND, "Remove directory operation failed."),
    }
}

pub fn handle_cmd_pwd(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    ctx.reply_quoted(session, PATH_CREATED, session.working_dir());
    CommandStatus::Success
}

/// Handles the CWD command: the target must be a directory under the root.
pub fn handle_cmd_cwd(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    if let Err(status) = real_path(ctx, session, args) {
        return status;
    }

    let changed = match ctx.account_root(session) {
        Ok(root) => change_directory(&*ctx.fs, root, session.working_dir(), args),
        Err(e) => Err(e),
    };

    match changed {
        Ok(working_dir) => {
            session.working_dir = working_dir;
            ctx.reply(session, FILE_ACTION_OK, "Directory successfully changed.");
            CommandStatus::Success
        }
        Err(e) => {
            info!("Session {}: {e}", session.id());
            fail(ctx, session, FILE_NOT_FOUND, "Failed to change directory.")
        }
    }
}

pub fn handle_cmd_cdup(ctx: &mut Context<'_>, session: &mut Session, _args: &str) -> CommandStatus {
    handle_cmd_cwd(ctx, session, "..")
}

/// Handles the TYPE command: `I` for binary, `A` for ASCII.
pub fn handle_cmd_type(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    match args.chars().next() {
        Some('I' | 'i') => {
            session.binary = true;
            ctx.reply(session, OK, "Switching to Binary mode.");
            CommandStatus::Success
        }
        Some('A' | 'a') => {
            session.binary = false;
            ctx.reply(session, OK, "Switching to ASCII mode.");
            CommandStatus::Success
        }
        _ => fail(ctx, session, NOT_IMPLEMENTED_FOR_PARAMETER, "Unrecognised TYPE command."),
    }
}

pub fn handle_cmd_stru(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    match args.chars().next() {
        Some('F' | 'f') => {
            ctx.reply(session, OK, "Structure set to F.");
            CommandStatus::Success
        }
        _ => fail(ctx, session, NOT_IMPLEMENTED_FOR_PARAMETER, "Bad STRU command."),
    }
}

pub fn handle_cmd_size(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };
    match ctx.fs.stat(&path) {
        Ok(info) => {
            ctx.reply(session, FILE_STATUS, &info.size.to_string());
            CommandStatus::Success
        }
        Err(_) => fail(ctx, session, FILE_NOT_FOUND, "Could not get file size."),
    }
}

pub fn handle_cmd_mdtm(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let path = match real_path(ctx, session, args) {
        Ok(path) => path,
        Err(status) => return status,
    };
    match ctx.fs.stat(&path) {
        Ok(info) => {
            let stamp = info.modified.format("%Y%m%d%H%M%S").to_string();
            ctx.reply(session, FILE_STATUS, &stamp);
            CommandStatus::Success
        }
        Err(_) => fail(ctx, session, FILE_NOT_FOUND, "Could not get file modification time."),
    }
}

/// Handles the MLST command: facts for a single path on the control connection.
pub fn handle_cmd_mlst(ctx: &mut Context<'_>, session: &mut Session, args: &str) -> CommandStatus {
    let target = if args.is_empty() {
        session.working_dir().to_string()
    } else {
        args.to_string()
    };
    let path = match real_path(ctx, session, &target) {
        Ok(path) => path,
        Err(status) => return status,
    };
    let info = match ctx.fs.stat(&path) {
        Ok(info) => info,
        Err(_) => return fail(ctx, session, FILE_NOT_FOUND, "No such file or directory."),
    };

    let shown = virtual_path(session.working_dir(), &target);
    let text = format_multiline(
        FILE_ACTION_OK,
        &format!("Listing {shown}"),
        &[format_facts(&shown, &info)],
        "End",
    );
    ctx.send_text(session, &text);
    CommandStatus::Success
}
