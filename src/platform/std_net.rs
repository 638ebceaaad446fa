//! Standard network backend
//!
//! `Network` implementation over non-blocking `std::net` sockets, with
//! readiness taken from `poll(2)` through nix.

use super::{Network, SocketHandle};
use log::trace;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};

enum Endpoint {
    Listener(TcpListener),
    Stream(TcpStream),
}

impl Endpoint {
    fn fd(&self) -> BorrowedFd<'_> {
        match self {
            Endpoint::Listener(listener) => listener.as_fd(),
            Endpoint::Stream(stream) => stream.as_fd(),
        }
    }
}

pub struct StdNetwork {
    sockets: HashMap<SocketHandle, Endpoint>,
    next_handle: u32,
    send_timeout: Duration,
}

impl StdNetwork {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            sockets: HashMap::new(),
            next_handle: 0,
            send_timeout,
        }
    }

    fn insert(&mut self, endpoint: Endpoint) -> SocketHandle {
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = SocketHandle(self.next_handle);
        self.sockets.insert(handle, endpoint);
        handle
    }

    fn endpoint(&self, socket: SocketHandle) -> io::Result<&Endpoint> {
        self.sockets.get(&socket).ok_or_else(stale_handle)
    }

    fn stream(&mut self, socket: SocketHandle) -> io::Result<&mut TcpStream> {
        match self.sockets.get_mut(&socket) {
            Some(Endpoint::Stream(stream)) => Ok(stream),
            Some(Endpoint::Listener(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a connected socket",
            )),
            None => Err(stale_handle()),
        }
    }
}

fn stale_handle() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "stale socket handle")
}

fn ipv4_only(addr: SocketAddr) -> io::Result<SocketAddrV4> {
    match addr {
        SocketAddr::V4(v4) => Ok(v4),
        SocketAddr::V6(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "IPv6 peers are not supported",
        )),
    }
}

fn poll_timeout(timeout: Duration) -> PollTimeout {
    i32::try_from(timeout.as_millis())
        .ok()
        .and_then(|millis| PollTimeout::try_from(millis).ok())
        .unwrap_or(PollTimeout::MAX)
}

/// Runs `poll(2)` over `fds` and returns how many entries have events.
fn poll_fds(fds: &mut [PollFd<'_>], timeout: Duration) -> io::Result<usize> {
    match poll(fds, poll_timeout(timeout)) {
        Ok(ready) => Ok(usize::try_from(ready).unwrap_or(0)),
        Err(Errno::EINTR) => Ok(0),
        Err(errno) => Err(errno.into()),
    }
}

/// Blocks until `fd` reports `events` or `timeout` elapses.
fn wait_for(fd: BorrowedFd<'_>, events: PollFlags, timeout: Duration) -> io::Result<bool> {
    let mut fds = [PollFd::new(fd, events)];
    Ok(poll_fds(&mut fds, timeout)? > 0)
}

impl Network for StdNetwork {
    fn listen(&mut self, addr: SocketAddrV4) -> io::Result<SocketHandle> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(self.insert(Endpoint::Listener(listener)))
    }

    fn accept(
        &mut self,
        listener: SocketHandle,
        timeout: Duration,
    ) -> io::Result<(SocketHandle, SocketAddrV4)> {
        let deadline = Instant::now() + timeout;
        let (stream, peer) = loop {
            let accepted = match self.endpoint(listener)? {
                Endpoint::Listener(l) => l.accept(),
                Endpoint::Stream(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "not a listening socket",
                    ));
                }
            };
            match accepted {
                Ok(pair) => break pair,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "no connection arrived in time",
                        ));
                    }
                    wait_for(self.endpoint(listener)?.fd(), PollFlags::POLLIN, deadline - now)?;
                }
                Err(e) => return Err(e),
            }
        };

        let peer = ipv4_only(peer)?;
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        trace!("Accepted socket from {peer}");
        Ok((self.insert(Endpoint::Stream(stream)), peer))
    }

    fn connect(&mut self, addr: SocketAddrV4, timeout: Duration) -> io::Result<SocketHandle> {
        let stream = TcpStream::connect_timeout(&SocketAddr::V4(addr), timeout)?;
        stream.set_nonblocking(true)?;
        Ok(self.insert(Endpoint::Stream(stream)))
    }

    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddrV4> {
        let addr = match self.endpoint(socket)? {
            Endpoint::Listener(listener) => listener.local_addr()?,
            Endpoint::Stream(stream) => stream.local_addr()?,
        };
        ipv4_only(addr)
    }

    fn send(&mut self, socket: SocketHandle, data: &[u8]) -> io::Result<()> {
        let send_timeout = self.send_timeout;
        let stream = self.stream(socket)?;
        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if !wait_for(stream.as_fd(), PollFlags::POLLOUT, send_timeout)? {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "peer stopped reading",
                        ));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn recv(&mut self, socket: SocketHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.stream(socket)?.read(buf)
    }

    fn close(&mut self, socket: SocketHandle) {
        if let Some(Endpoint::Stream(stream)) = self.sockets.remove(&socket) {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    fn poll(
        &mut self,
        sockets: &[SocketHandle],
        timeout: Duration,
    ) -> io::Result<Vec<SocketHandle>> {
        let mut handles = Vec::with_capacity(sockets.len());
        let mut fds = Vec::with_capacity(sockets.len());
        for &socket in sockets {
            if let Some(endpoint) = self.sockets.get(&socket) {
                handles.push(socket);
                fds.push(PollFd::new(endpoint.fd(), PollFlags::POLLIN));
            }
        }

        if poll_fds(&mut fds, timeout)? == 0 {
            return Ok(Vec::new());
        }

        Ok(handles
            .into_iter()
            .zip(fds)
            .filter(|(_, fd)| fd.revents().is_some_and(|events| !events.is_empty()))
            .map(|(handle, _)| handle)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_loopback_round_trip() {
        let mut net = StdNetwork::new(Duration::from_secs(1));
        let listener = net
            .listen(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .unwrap();
        let addr = net.local_addr(listener).unwrap();

        let client = net.connect(addr, Duration::from_secs(1)).unwrap();
        let ready = net.poll(&[listener], Duration::from_secs(1)).unwrap();
        assert_eq!(ready, vec![listener]);

        let (server, peer) = net.accept(listener, Duration::from_secs(1)).unwrap();
        assert_eq!(peer.ip(), &Ipv4Addr::LOCALHOST);

        net.send(client, b"NOOP\r\n").unwrap();
        let ready = net.poll(&[server], Duration::from_secs(1)).unwrap();
        assert_eq!(ready, vec![server]);

        let mut buf = [0u8; 16];
        let n = net.recv(server, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"NOOP\r\n");

        net.close(client);
        net.close(server);
        net.close(listener);
    }

    #[test]
    fn test_poll_reports_only_ready_sockets() {
        let mut net = StdNetwork::new(Duration::from_secs(1));
        let listener = net
            .listen(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .unwrap();
        let idle = net
            .listen(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .unwrap();
        let ready = net
            .poll(&[listener, idle], Duration::from_millis(20))
            .unwrap();
        assert!(ready.is_empty());

        let addr = net.local_addr(listener).unwrap();
        let _client = net.connect(addr, Duration::from_secs(1)).unwrap();
        let ready = net
            .poll(&[idle, listener, SocketHandle(999)], Duration::from_secs(1))
            .unwrap();
        assert_eq!(ready, vec![listener]);
    }

    #[test]
    fn test_accept_times_out() {
        let mut net = StdNetwork::new(Duration::from_secs(1));
        let listener = net
            .listen(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .unwrap();
        let err = net
            .accept(listener, Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
