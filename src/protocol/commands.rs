//! Module `commands`
//!
//! The static command table. Each entry carries the policy the dispatcher
//! enforces before running its handler. Verbs match by prefix in table order,
//! so aliases such as PWD/XPWD and MKD/XMKD are separate entries.

use super::handlers;
use crate::auth::AccessRights;
use crate::client::Session;
use crate::server::Context;

/// Represents the outcome status of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The command was answered with an error reply.
    Failure(String),
    CloseConnection,
}

pub type Handler = fn(&mut Context<'_>, &mut Session, &str) -> CommandStatus;

pub struct CommandSpec {
    pub verb: &'static str,
    pub rights: AccessRights,
    pub need_login: bool,
    /// Listed in the FEAT reply
    pub report_in_feat: bool,
    /// May run while a transmission is active
    pub during_transfer: bool,
    /// Belongs to the RFC3659 extension set
    pub rfc3659: bool,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("verb", &self.verb)
            .field("rights", &self.rights)
            .field("need_login", &self.need_login)
            .finish_non_exhaustive()
    }
}

const NONE: AccessRights = AccessRights::empty();
const RD: AccessRights = AccessRights::READ;
const WR: AccessRights = AccessRights::WRITE;
const LS: AccessRights = AccessRights::LIST;
const DIR: AccessRights = AccessRights::DIR;

const fn cmd(
    verb: &'static str,
    rights: AccessRights,
    need_login: bool,
    during_transfer: bool,
    handler: Handler,
) -> CommandSpec {
    CommandSpec {
        verb,
        rights,
        need_login,
        report_in_feat: false,
        during_transfer,
        rfc3659: false,
        handler,
    }
}

const fn ext(verb: &'static str, rights: AccessRights, handler: Handler) -> CommandSpec {
    CommandSpec {
        verb,
        rights,
        need_login: true,
        report_in_feat: true,
        during_transfer: false,
        rfc3659: true,
        handler,
    }
}

pub static COMMANDS: [CommandSpec; 28] = [
    cmd("USER", NONE, false, false, handlers::handle_cmd_user),
    cmd("PASS", NONE, false, false, handlers::handle_cmd_pass),
    cmd("SYST", NONE, true, false, handlers::handle_cmd_syst),
    cmd("PORT", NONE, true, false, handlers::handle_cmd_port),
    cmd("NOOP", NONE, true, false, handlers::handle_cmd_noop),
    cmd("QUIT", NONE, false, true, handlers::handle_cmd_quit),
    cmd("ABOR", NONE, false, true, handlers::handle_cmd_abor),
    cmd("FEAT", NONE, false, false, handlers::handle_cmd_feat),
    cmd("LIST", LS, true, false, handlers::handle_cmd_list),
    cmd("NLST", LS, true, false, handlers::handle_cmd_nlst),
    cmd("PWD", RD, true, false, handlers::handle_cmd_pwd),
    cmd("XPWD", DIR, true, false, handlers::handle_cmd_pwd),
    cmd("TYPE", NONE, true, false, handlers::handle_cmd_type),
    cmd("PASV", NONE, true, false, handlers::handle_cmd_pasv),
    cmd("CWD", DIR, true, false, handlers::handle_cmd_cwd),
    cmd("CDUP", DIR, true, false, handlers::handle_cmd_cdup),
    cmd("STRU", NONE, true, false, handlers::handle_cmd_stru),
    cmd("RETR", RD, true, false, handlers::handle_cmd_retr),
    cmd("STOR", WR, true, false, handlers::handle_cmd_stor),
    cmd("DELE", WR, true, false, handlers::handle_cmd_dele),
    cmd("MKD", WR, true, false, handlers::handle_cmd_mkd),
    cmd("XMKD", WR, true, false, handlers::handle_cmd_mkd),
    cmd("RMD", WR, true, false, handlers::handle_cmd_rmd),
    cmd("XRMD", WR, true, false, handlers::handle_cmd_rmd),
    ext("SIZE", RD, handlers::handle_cmd_size),
    ext("MDTM", RD, handlers::handle_cmd_mdtm),
    ext("MLST", RD, handlers::handle_cmd_mlst),
    ext("MLSD", LS, handlers::handle_cmd_mlsd),
];

/// Finds the first table entry whose verb prefixes `line`.
pub fn find_command(line: &str, rfc3659: bool) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .filter(|spec| rfc3659 || !spec.rfc3659)
        .find(|spec| line.starts_with(spec.verb))
}

/// Verbs announced by FEAT.
pub fn feature_verbs(rfc3659: bool) -> impl Iterator<Item = &'static str> {
    COMMANDS
        .iter()
        .filter(move |spec| spec.report_in_feat && (rfc3659 || !spec.rfc3659))
        .map(|spec| spec.verb)
}
