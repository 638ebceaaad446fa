//! Test doubles for driving a `Server` without real sockets.
#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use mini_ftpd::auth::{AccessRights, AccountRegistry};
use mini_ftpd::platform::{
    Clock, FileHandle, FileSystem, LocalFileSystem, Network, OpenMode, PathInfo, SocketHandle,
};
use mini_ftpd::{Server, ServerConfig};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

pub const CONTROL_PORT: u16 = 2121;
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
pub const CLIENT_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

#[derive(Debug)]
enum Endpoint {
    Listener {
        addr: SocketAddrV4,
        pending: VecDeque<SocketHandle>,
    },
    Stream(Stream),
}

#[derive(Debug, Default)]
struct Stream {
    local: Option<SocketAddrV4>,
    peer: Option<SocketAddrV4>,
    /// Bytes waiting for the server to recv
    inbox: VecDeque<u8>,
    /// Bytes the server sent
    outbox: Vec<u8>,
    peer_closed: bool,
    reset: bool,
    fail_send: bool,
}

#[derive(Debug, Default)]
struct NetState {
    endpoints: HashMap<SocketHandle, Endpoint>,
    closed: Vec<SocketHandle>,
    /// Active-mode connections the server opened, with their target
    outgoing: Vec<(SocketAddrV4, SocketHandle)>,
    refuse_connect: bool,
    next: u32,
}

impl NetState {
    fn issue(&mut self, endpoint: Endpoint) -> SocketHandle {
        self.next += 1;
        let handle = SocketHandle(self.next);
        self.endpoints.insert(handle, endpoint);
        handle
    }

    fn stream(&mut self, handle: SocketHandle) -> io::Result<&mut Stream> {
        match self.endpoints.get_mut(&handle) {
            Some(Endpoint::Stream(stream)) => Ok(stream),
            _ => Err(io::Error::new(io::ErrorKind::NotConnected, "no such stream")),
        }
    }

    fn listener_on(&self, port: u16) -> Option<SocketHandle> {
        self.endpoints.iter().find_map(|(handle, endpoint)| match endpoint {
            Endpoint::Listener { addr, .. } if addr.port() == port => Some(*handle),
            _ => None,
        })
    }
}

/// In-memory network shared between the server and the test.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    state: Rc<RefCell<NetState>>,
}

impl MockNetwork {
    /// Queues a client connection on the listener bound to `port`.
    pub fn connect_client(&self, port: u16) -> Option<SocketHandle> {
        let mut state = self.state.borrow_mut();
        let listener = state.listener_on(port)?;
        let stream = Stream {
            local: Some(SocketAddrV4::new(SERVER_IP, port)),
            peer: Some(SocketAddrV4::new(CLIENT_IP, 40000 + state.next as u16)),
            ..Stream::default()
        };
        let handle = state.issue(Endpoint::Stream(stream));
        if let Some(Endpoint::Listener { pending, .. }) = state.endpoints.get_mut(&listener) {
            pending.push_back(handle);
        }
        Some(handle)
    }

    pub fn client_send(&self, socket: SocketHandle, data: &[u8]) {
        if let Ok(stream) = self.state.borrow_mut().stream(socket) {
            stream.inbox.extend(data);
        }
    }

    /// Drains what the server sent on `socket`.
    pub fn take_output(&self, socket: SocketHandle) -> Vec<u8> {
        self.state
            .borrow_mut()
            .stream(socket)
            .map(|stream| std::mem::take(&mut stream.outbox))
            .unwrap_or_default()
    }

    pub fn take_text(&self, socket: SocketHandle) -> String {
        String::from_utf8_lossy(&self.take_output(socket)).into_owned()
    }

    /// Orderly close from the client side.
    pub fn client_close(&self, socket: SocketHandle) {
        if let Ok(stream) = self.state.borrow_mut().stream(socket) {
            stream.peer_closed = true;
        }
    }

    pub fn client_reset(&self, socket: SocketHandle) {
        if let Ok(stream) = self.state.borrow_mut().stream(socket) {
            stream.reset = true;
        }
    }

    pub fn fail_sends(&self, socket: SocketHandle) {
        if let Ok(stream) = self.state.borrow_mut().stream(socket) {
            stream.fail_send = true;
        }
    }

    pub fn refuse_connections(&self) {
        self.state.borrow_mut().refuse_connect = true;
    }

    pub fn is_closed(&self, socket: SocketHandle) -> bool {
        self.state.borrow().closed.contains(&socket)
    }

    pub fn outgoing(&self) -> Vec<(SocketAddrV4, SocketHandle)> {
        self.state.borrow().outgoing.clone()
    }

    pub fn has_listener_on(&self, port: u16) -> bool {
        self.state.borrow().listener_on(port).is_some()
    }
}

impl Network for MockNetwork {
    fn listen(&mut self, addr: SocketAddrV4) -> io::Result<SocketHandle> {
        let mut state = self.state.borrow_mut();
        if state.listener_on(addr.port()).is_some() {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "port in use"));
        }
        Ok(state.issue(Endpoint::Listener {
            addr,
            pending: VecDeque::new(),
        }))
    }

    fn accept(
        &mut self,
        listener: SocketHandle,
        _timeout: Duration,
    ) -> io::Result<(SocketHandle, SocketAddrV4)> {
        let mut state = self.state.borrow_mut();
        let socket = match state.endpoints.get_mut(&listener) {
            Some(Endpoint::Listener { pending, .. }) => pending.pop_front(),
            _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a listener")),
        };
        let socket =
            socket.ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "nobody connected"))?;
        let peer = state.stream(socket)?.peer.unwrap_or(SocketAddrV4::new(CLIENT_IP, 0));
        Ok((socket, peer))
    }

    fn connect(&mut self, addr: SocketAddrV4, _timeout: Duration) -> io::Result<SocketHandle> {
        let mut state = self.state.borrow_mut();
        if state.refuse_connect {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        let handle = state.issue(Endpoint::Stream(Stream {
            local: Some(SocketAddrV4::new(SERVER_IP, 20)),
            peer: Some(addr),
            ..Stream::default()
        }));
        state.outgoing.push((addr, handle));
        Ok(handle)
    }

    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4> {
        match self.state.borrow().endpoints.get(&socket) {
            Some(Endpoint::Listener { addr, .. }) => Ok(*addr),
            Some(Endpoint::Stream(stream)) => stream
                .local
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "unbound")),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such socket")),
        }
    }

    fn send(&mut self, socket: SocketHandle, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let stream = state.stream(socket)?;
        if stream.fail_send || stream.reset || stream.peer_closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
        }
        stream.outbox.extend_from_slice(data);
        Ok(())
    }

    fn recv(&mut self, socket: SocketHandle, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        let stream = state.stream(socket)?;
        if stream.reset {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        }
        if stream.inbox.is_empty() {
            if stream.peer_closed {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data"));
        }
        let n = buf.len().min(stream.inbox.len());
        for (slot, byte) in buf.iter_mut().zip(stream.inbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self, socket: SocketHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(Endpoint::Listener { .. }) = state.endpoints.get(&socket) {
            state.endpoints.remove(&socket);
        }
        state.closed.push(socket);
    }

    fn poll(&mut self, sockets: &[SocketHandle], _timeout: Duration) -> io::Result<Vec<SocketHandle>> {
        let state = self.state.borrow();
        Ok(sockets
            .iter()
            .copied()
            .filter(|socket| match state.endpoints.get(socket) {
                Some(Endpoint::Listener { pending, .. }) => !pending.is_empty(),
                Some(Endpoint::Stream(stream)) => {
                    !stream.inbox.is_empty() || stream.peer_closed || stream.reset
                }
                None => false,
            })
            .collect())
    }
}

/// Clock the test moves by hand.
#[derive(Debug, Clone)]
pub struct MockClock {
    secs: Rc<Cell<i64>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            secs: Rc::new(Cell::new(1_700_000_000)),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.secs.set(self.secs.get() + secs);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Local> {
        Local
            .timestamp_opt(self.secs.get(), 0)
            .single()
            .unwrap_or_else(Local::now)
    }
}

/// Local filesystem whose writes start failing once a byte budget is spent.
#[derive(Debug)]
pub struct FullDisk {
    inner: LocalFileSystem,
    budget: Rc<Cell<usize>>,
}

impl FullDisk {
    pub fn new(budget: usize) -> Self {
        Self {
            inner: LocalFileSystem::new(),
            budget: Rc::new(Cell::new(budget)),
        }
    }
}

impl FileSystem for FullDisk {
    fn open(&mut self, path: &str, mode: OpenMode) -> io::Result<FileHandle> {
        self.inner.open(path, mode)
    }

    fn read(&mut self, file: FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(file, buf)
    }

    fn write(&mut self, file: FileHandle, data: &[u8]) -> io::Result<()> {
        let left = self.budget.get();
        if data.len() > left {
            return Err(io::Error::other("no space left on device"));
        }
        self.budget.set(left - data.len());
        self.inner.write(file, data)
    }

    fn close(&mut self, file: FileHandle) {
        self.inner.close(file)
    }

    fn stat(&self, path: &str) -> io::Result<PathInfo> {
        self.inner.stat(path)
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<String>> {
        self.inner.read_dir(path)
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        self.inner.remove_file(path)
    }

    fn make_dir(&mut self, path: &str) -> io::Result<()> {
        self.inner.make_dir(path)
    }

    fn remove_dir(&mut self, path: &str) -> io::Result<()> {
        self.inner.remove_dir(path)
    }
}

/// A server on the mock network with one account rooted in a temp dir.
pub struct Harness {
    pub server: Server,
    pub net: MockNetwork,
    pub clock: MockClock,
    pub root: TempDir,
}

impl Harness {
    pub fn new(rights: AccessRights) -> Self {
        Self::with_config(ServerConfig::default(), rights)
    }

    pub fn with_config(config: ServerConfig, rights: AccessRights) -> Self {
        let root = TempDir::new().unwrap();
        let mut accounts = AccountRegistry::new(config.account_limits());
        accounts
            .create_account("anonymous", "", root.path().to_str().unwrap(), rights)
            .unwrap();
        accounts
            .create_account("admin", "secret", root.path().to_str().unwrap(), AccessRights::all())
            .unwrap();

        let net = MockNetwork::default();
        let clock = MockClock::new();
        let mut server = Server::with_network(config, accounts, Box::new(net.clone()))
            .with_clock(Box::new(clock.clone()));
        server.start().unwrap();

        Self {
            server,
            net,
            clock,
            root,
        }
    }

    pub fn with_filesystem(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.server = self.server.with_filesystem(fs);
        self
    }

    pub fn tick(&mut self) {
        self.server.run_once().unwrap();
    }

    /// Opens a control connection and consumes the greeting.
    pub fn connect(&mut self) -> SocketHandle {
        let client = self.net.connect_client(CONTROL_PORT).unwrap();
        self.tick();
        let greeting = self.net.take_text(client);
        assert!(greeting.starts_with("220 "), "greeting: {greeting}");
        client
    }

    /// Sends one command line and returns the replies of one reactor pass.
    pub fn command(&mut self, client: SocketHandle, line: &str) -> String {
        self.net.client_send(client, format!("{line}\r\n").as_bytes());
        self.tick();
        self.net.take_text(client)
    }

    pub fn login(&mut self, client: SocketHandle) {
        assert!(self.command(client, "USER anonymous").starts_with("331 "));
        assert!(self.command(client, "PASS ").starts_with("230 "));
    }

    /// Enters passive mode and connects a data socket to the advertised port.
    pub fn passive_data(&mut self, client: SocketHandle) -> SocketHandle {
        let reply = self.command(client, "PASV");
        assert!(reply.starts_with("227 "), "PASV reply: {reply}");
        let port = parse_pasv_port(&reply);
        self.net.connect_client(port).unwrap()
    }

    pub fn path(&self, name: &str) -> std::path::PathBuf {
        self.root.path().join(name)
    }
}

/// Port number of a `227 ... (h1,h2,h3,h4,p1,p2)` reply.
pub fn parse_pasv_port(reply: &str) -> u16 {
    let inner = &reply[reply.find('(').unwrap() + 1..reply.find(')').unwrap()];
    let fields: Vec<u16> = inner.split(',').map(|f| f.parse().unwrap()).collect();
    fields[4] * 256 + fields[5]
}
