use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::Result;
use crate::poll::wait_readable;

/// The connected peer. Implements Read + Write.
///
/// Wraps the accepted TCP stream and remembers the remote address for
/// diagnostics. Dropping the stream closes the connection.
pub struct PeerStream {
    inner: TcpStream,
    peer_addr: Option<SocketAddr>,
}

impl Read for PeerStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for PeerStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl PeerStream {
    /// Wrap an accepted or connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let peer_addr = stream.peer_addr().ok();
        Self {
            inner: stream,
            peer_addr,
        }
    }

    /// Wait up to `timeout` for request bytes to arrive.
    ///
    /// Returns `Ok(false)` if nothing arrived in time. Signal interruptions
    /// are absorbed and the wait resumes with the remaining budget.
    pub fn wait_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        wait_readable(&self.inner, timeout).map_err(Into::into)
    }

    /// Disable Nagle batching so small header writes are not delayed.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Remote address of the peer, if the OS still reports it.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Shut down both directions of the connection.
    ///
    /// Errors are ignored: the peer may already have gone away.
    pub fn close(self) {
        let _ = self.inner.shutdown(Shutdown::Both);
    }
}

impl std::fmt::Debug for PeerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerStream")
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}
