use std::fmt;
use std::io;

use frameserv_pixmap::PixmapError;
use frameserv_server::ServerError;
use frameserv_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::Accept(source) | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn pixmap_error(context: &str, err: PixmapError) -> CliError {
    match err {
        PixmapError::Io(source) => io_error(context, source),
        PixmapError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Transport(err) => transport_error(context, err),
        ServerError::Pixmap(err) => pixmap_error(context, err),
        ServerError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ServerError::InvalidRange { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        ServerError::Disconnected | ServerError::Send(_) | ServerError::Recv(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use super::*;

    #[test]
    fn port_in_use_is_transport_error() {
        let err = ServerError::Transport(TransportError::SocketUnavailable {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        });
        assert_eq!(server_error("listen failed", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn timeouts_map_to_timeout() {
        let err = ServerError::Transport(TransportError::Timeout(Duration::from_secs(1)));
        assert_eq!(server_error("accept", err).code, TIMEOUT);
        let err = io::Error::from(io::ErrorKind::WouldBlock);
        assert_eq!(io_error("read", err).code, TIMEOUT);
    }

    #[test]
    fn bad_pixmap_is_data_invalid() {
        assert_eq!(pixmap_error("decode", PixmapError::InvalidMagic).code, DATA_INVALID);
        let err = CliError::new(USAGE, "bad");
        assert_eq!(err.to_string(), "bad");
    }
}
