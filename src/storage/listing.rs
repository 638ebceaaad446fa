//! Directory listings
//!
//! Formats directory entries for LIST, NLST, MLSD and MLST and streams them
//! over a data connection.

use crate::client::Session;
use crate::platform::{FileKind, PathInfo, SocketHandle};
use crate::protocol::responses::{LOCAL_ERROR, OPENING_DATA, TRANSFER_ABORTED, TRANSFER_COMPLETE};
use crate::server::Context;
use chrono::{Datelike, NaiveDateTime};
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `ls -l` style lines
    List,
    /// Bare names
    Nlst,
    /// RFC3659 fact lines
    Mlsd,
}

/// One `ls -l` style line. Entries from the current year show the time of
/// day; older ones show the year.
pub fn format_list_line(name: &str, info: &PathInfo, now: NaiveDateTime) -> String {
    let kind = match info.kind {
        FileKind::File => '-',
        FileKind::Dir => 'd',
        FileKind::Link => 'l',
    };
    let date = if info.modified.year() == now.year() {
        info.modified.format("%b %d %H:%M").to_string()
    } else {
        format!("{} {:>5}", info.modified.format("%b %d"), info.modified.year())
    };
    format!(
        "{kind}rwxrwxrwx {:>4} {:<8} {:<8} {:>8} {date} {name}",
        info.links, info.user, info.group, info.size
    )
}

/// RFC3659 fact line: `Type=..;Size=..;Modify=..;Perm=r; name`.
pub fn format_facts(name: &str, info: &PathInfo) -> String {
    let kind = if name == ".." {
        "pdir"
    } else {
        match info.kind {
            FileKind::File => "file",
            FileKind::Dir => "dir",
            FileKind::Link => "OS.unix=slink",
        }
    };
    format!(
        "Type={kind};Size={};Modify={};Perm=r; {name}",
        info.size,
        info.modified.format("%Y%m%d%H%M%S")
    )
}

fn format_entry(format: ListFormat, name: &str, info: &PathInfo, now: NaiveDateTime) -> String {
    let mut line = match format {
        ListFormat::List => format_list_line(name, info, now),
        ListFormat::Nlst => name.to_string(),
        ListFormat::Mlsd => format_facts(name, info),
    };
    line.push_str("\r\n");
    line
}

/// Streams the listing of `dir_path` to `socket` and sends the closing reply.
///
/// Replies 451 without a preliminary 150 if the directory cannot be read.
/// Hidden entries (leading '.') are skipped.
pub fn send_listing(
    ctx: &mut Context<'_>,
    session: &Session,
    socket: SocketHandle,
    dir_path: &str,
    format: ListFormat,
) {
    let names = match ctx.fs.read_dir(dir_path) {
        Ok(names) => names,
        Err(e) => {
            warn!("Session {}: cannot list {dir_path}: {e}", session.id());
            ctx.reply(session, LOCAL_ERROR, "Cannot open directory.");
            return;
        }
    };

    ctx.reply(session, OPENING_DATA, "Here comes the directory listing.");

    let now = ctx.clock.now().naive_local();
    let mut listed = 0usize;
    let mut failed = 0usize;
    for name in names.iter().filter(|name| !name.starts_with('.')) {
        let info = match ctx
            .resolve(session, name, false)
            .ok()
            .and_then(|path| ctx.fs.stat(&path).ok())
        {
            Some(info) => info,
            None => {
                failed += 1;
                continue;
            }
        };

        let line = format_entry(format, name, &info, now);
        if let Err(e) = ctx.net.send(socket, line.as_bytes()) {
            warn!("Session {}: listing aborted: {e}", session.id());
            ctx.reply(session, TRANSFER_ABORTED, "Data connection error.");
            return;
        }
        listed += 1;
    }

    debug!("Session {}: listed {listed} entries of {dir_path}", session.id());
    if failed > 0 && listed == 0 {
        ctx.reply(session, LOCAL_ERROR, "Error reading directory entries.");
    } else {
        ctx.reply(session, TRANSFER_COMPLETE, "Directory send OK.");
    }
}
