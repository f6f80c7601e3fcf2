use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::poll::wait_readable;
use crate::stream::PeerStream;

/// Listening TCP socket for the frame server.
///
/// Created with `SO_REUSEADDR` so a restarted render can rebind the port
/// while old connections linger in `TIME_WAIT`.
pub struct TcpServerSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpServerSocket {
    /// Backlog passed to `listen(2)`; the platform's default maximum.
    pub const DEFAULT_BACKLOG: i32 = libc::SOMAXCONN;

    /// Bind and listen on an explicit address. Port 0 picks a free port.
    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let unavailable = |source| TransportError::SocketUnavailable { addr, source };

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(unavailable)?;
        socket.set_reuse_address(true).map_err(unavailable)?;
        socket.bind(&addr.into()).map_err(unavailable)?;
        socket.listen(Self::DEFAULT_BACKLOG).map_err(unavailable)?;

        let listener: TcpListener = socket.into();
        let local_addr = listener.local_addr().map_err(unavailable)?;

        info!(%local_addr, "frame server listening");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept the next connection, waiting at most `timeout`.
    ///
    /// `None` blocks until a peer connects. Returns
    /// [`TransportError::Timeout`] if nobody connected in time.
    pub fn accept_timeout(&self, timeout: Option<Duration>) -> Result<PeerStream> {
        if let Some(limit) = timeout {
            let ready = wait_readable(&self.listener, Some(limit)).map_err(TransportError::Accept)?;
            if !ready {
                return Err(TransportError::Timeout(limit));
            }
        }

        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(peer = %addr, "accepted connection");
        Ok(PeerStream::from_tcp(stream))
    }

    /// The address this socket is bound to (with the real port if 0 was requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for TcpServerSocket {
    fn drop(&mut self) {
        debug!(local_addr = %self.local_addr, "closing listening socket");
    }
}

impl std::fmt::Debug for TcpServerSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpServerSocket")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}
