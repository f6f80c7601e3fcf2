use std::net::SocketAddr;
use std::time::Duration;

/// Errors that can occur in frame server transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host network subsystem could not be initialized.
    #[error("network subsystem startup failed: {0}")]
    Startup(String),

    /// Binding or listening on the requested address failed.
    #[error("socket unavailable on {addr}: {source}")]
    SocketUnavailable {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// No connection or data arrived within the wait budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The listening socket has been closed.
    #[error("not listening")]
    NotListening,

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
