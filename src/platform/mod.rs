//! Platform boundary
//!
//! Everything the protocol engine needs from the operating system goes through
//! the traits in this module: sockets, files, the wall clock and the
//! deployment-specific hooks (NAT, UPnP, client allow-lists). The engine only
//! ever sees opaque handles.

pub mod clock;
pub mod hooks;
pub mod local_fs;
#[cfg(unix)]
pub mod std_net;

use chrono::{DateTime, Local, NaiveDateTime};
use std::io;
use std::net::SocketAddrV4;
use std::time::Duration;

pub use clock::SystemClock;
pub use hooks::{ConfiguredHooks, ServerHooks};
pub use local_fs::LocalFileSystem;
#[cfg(unix)]
pub use std_net::StdNetwork;

/// Opaque socket handle issued by a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketHandle(pub u32);

/// Opaque file handle issued by a [`FileSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate for writing.
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Link,
}

/// Result of a `stat` call.
#[derive(Debug, Clone)]
pub struct PathInfo {
    pub kind: FileKind,
    pub size: u64,
    pub links: u64,
    pub user: String,
    pub group: String,
    /// Local modification time.
    pub modified: NaiveDateTime,
}

/// TCP/IPv4 socket operations.
///
/// `recv` never blocks: `ErrorKind::WouldBlock` means no bytes are available
/// yet and `Ok(0)` means the peer closed the connection.
pub trait Network {
    fn listen(&mut self, addr: SocketAddrV4) -> io::Result<SocketHandle>;

    /// Accepts one pending connection, waiting at most `timeout`.
    fn accept(
        &mut self,
        listener: SocketHandle,
        timeout: Duration,
    ) -> io::Result<(SocketHandle, SocketAddrV4)>;

    fn connect(&mut self, addr: SocketAddrV4, timeout: Duration) -> io::Result<SocketHandle>;

    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4>;

    /// Sends every byte of `data` or fails.
    fn send(&mut self, socket: SocketHandle, data: &[u8]) -> io::Result<()>;

    fn recv(&mut self, socket: SocketHandle, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self, socket: SocketHandle);

    /// Returns the subset of `sockets` that are readable (or have a pending
    /// connection, or hung up), waiting at most `timeout`.
    fn poll(&mut self, sockets: &[SocketHandle], timeout: Duration)
    -> io::Result<Vec<SocketHandle>>;
}

/// File and directory operations on server paths.
pub trait FileSystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> io::Result<FileHandle>;

    fn read(&mut self, file: FileHandle, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes every byte of `data` or fails.
    fn write(&mut self, file: FileHandle, data: &[u8]) -> io::Result<()>;

    fn close(&mut self, file: FileHandle);

    fn stat(&self, path: &str) -> io::Result<PathInfo>;

    /// Names of the entries in a directory.
    fn read_dir(&self, path: &str) -> io::Result<Vec<String>>;

    fn remove_file(&mut self, path: &str) -> io::Result<()>;

    fn make_dir(&mut self, path: &str) -> io::Result<()>;

    fn remove_dir(&mut self, path: &str) -> io::Result<()>;
}

pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn unix_time(&self) -> i64 {
        self.now().timestamp()
    }
}
