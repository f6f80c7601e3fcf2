use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default TCP port of the frame server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default wait for a request once a peer is connected. Generous enough for
/// typing a request by hand in a telnet session.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request read in one go.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 4096;

/// Longest reconfigure query kept in the change-request slot.
pub const DEFAULT_MAX_CHANGE_REQUEST_LEN: usize = 1024;

/// Frame server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to listen on. Default: all IPv4 interfaces.
    pub bind_address: IpAddr,
    /// TCP port. Port 0 lets the OS pick one.
    pub port: u16,
    /// Bounded wait for request bytes from a connected peer.
    pub request_timeout: Duration,
    /// Wait for an incoming connection. `None` blocks until a peer arrives.
    pub accept_timeout: Option<Duration>,
    /// Read buffer size for a single request.
    pub max_request_size: usize,
    /// Bound on the stored reconfigure query, in bytes.
    pub max_change_request_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_timeout: None,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            max_change_request_len: DEFAULT_MAX_CHANGE_REQUEST_LEN,
        }
    }
}

impl ServerConfig {
    /// Override the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the listening interface.
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Override the request wait.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the accept wait.
    pub fn with_accept_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// Frames a render will produce, supplied by the render loop at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRange {
    start: i32,
    end: i32,
    frame_rate: i32,
}

impl RenderRange {
    /// Create a range covering `start..=end`.
    pub fn new(start: i32, end: i32, frame_rate: i32) -> crate::Result<Self> {
        if end < start {
            return Err(crate::ServerError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            frame_rate,
        })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    /// Last frame, inclusive.
    pub fn end(&self) -> i32 {
        self.end
    }

    /// Frames per second reported on the info page.
    pub fn frame_rate(&self) -> i32 {
        self.frame_rate
    }

    pub fn contains(&self, frame: i32) -> bool {
        (self.start..=self.end).contains(&frame)
    }

    /// Number of frames in the range.
    pub fn len(&self) -> u64 {
        (i64::from(self.end) - i64::from(self.start) + 1) as u64
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
