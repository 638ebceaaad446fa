//! FTP Response handling
//!
//! Defines FTP response codes and formatting.

/// Standard FTP response codes
pub const OPENING_DATA: u16 = 150;
pub const OK: u16 = 200;
pub const FEATURES: u16 = 211;
pub const FILE_STATUS: u16 = 213;
pub const SYSTEM_TYPE: u16 = 215;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const PASSIVE_MODE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const SERVICE_CLOSING: u16 = 421;
pub const CANT_OPEN_DATA: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const FILE_UNAVAILABLE: u16 = 450;
pub const LOCAL_ERROR: u16 = 451;
pub const SYNTAX_ERROR: u16 = 500;
pub const BAD_PARAMETER: u16 = 501;
pub const NOT_IMPLEMENTED_FOR_PARAMETER: u16 = 504;
pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_NOT_FOUND: u16 = 550;

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{code:03} {message}\r\n")
}

/// Format a response whose text is a quoted path (PWD)
pub fn format_quoted(code: u16, message: &str) -> String {
    format!("{code:03} \"{message}\"\r\n")
}

/// Format a multi-line response: `code-header`, indented body lines, `code footer`
pub fn format_multiline(code: u16, header: &str, lines: &[String], footer: &str) -> String {
    let mut out = format!("{code:03}-{header}\r\n");
    for line in lines {
        out.push(' ');
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str(&format_response(code, footer));
    out
}

/// PASV reply text for `ip:port`
pub fn passive_address(ip: std::net::Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!(
        "Entering Passive Mode ({a},{b},{c},{d},{},{})",
        port >> 8,
        port & 0xff
    )
}
