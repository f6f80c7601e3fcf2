use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use frameserv_transport::PeerStream;
use tracing::trace;

use crate::error::{Result, ServerError};

/// One unit of input for the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// No bytes were read: continue the running stream.
    Empty,
    /// Request text as received, at most one read's worth.
    Raw(Bytes),
}

impl Request {
    pub fn is_empty(&self) -> bool {
        match self {
            Request::Empty => true,
            Request::Raw(bytes) => bytes.is_empty(),
        }
    }
}

/// Wait up to `timeout` for request bytes and read at most `max_size` of them.
///
/// Signal interruptions during the wait or the read are retried. A peer that
/// closes without sending anything yields [`ServerError::Disconnected`].
pub fn read_request(stream: &mut PeerStream, timeout: Duration, max_size: usize) -> Result<Request> {
    let ready = stream.wait_readable(Some(timeout)).map_err(|err| match err {
        frameserv_transport::TransportError::Io(io) => ServerError::Recv(io),
        other => ServerError::Transport(other),
    })?;
    if !ready {
        return Err(ServerError::Timeout(timeout));
    }

    let mut buf = BytesMut::zeroed(max_size.max(1));
    let n = loop {
        match stream.read(&mut buf) {
            Ok(n) => break n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(ServerError::Recv(err)),
        }
    };
    if n == 0 {
        return Err(ServerError::Disconnected);
    }
    buf.truncate(n);
    trace!(bytes = n, "request received");
    Ok(Request::Raw(buf.freeze()))
}

/// Build a request from literal text, as the router sees it.
#[cfg(test)]
pub(crate) fn request_from(text: &[u8]) -> Request {
    if text.is_empty() {
        return Request::Empty;
    }
    Request::Raw(Bytes::copy_from_slice(text))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    use super::*;

    fn pair() -> (PeerStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let client = TcpStream::connect(listener.local_addr().expect("local addr"))
            .expect("client should connect");
        let (server, _) = listener.accept().expect("listener should accept");
        (PeerStream::from_tcp(server), client)
    }

    #[test]
    fn reads_request_line() {
        let (mut server, mut client) = pair();
        client
            .write_all(b"GET /info.txt HTTP/1.0\r\n\r\n")
            .expect("write should succeed");

        let request = read_request(&mut server, Duration::from_secs(2), 4096)
            .expect("request should arrive");
        assert_eq!(request, request_from(b"GET /info.txt HTTP/1.0\r\n\r\n"));
    }

    #[test]
    fn silent_peer_times_out() {
        let (mut server, _client) = pair();
        let err = read_request(&mut server, Duration::from_millis(20), 4096)
            .expect_err("nothing was sent");
        assert!(matches!(err, ServerError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn closed_peer_is_disconnected() {
        let (mut server, client) = pair();
        drop(client);
        let err = read_request(&mut server, Duration::from_secs(2), 4096)
            .expect_err("peer closed");
        assert!(matches!(err, ServerError::Disconnected));
    }

    #[test]
    fn read_is_bounded() {
        let (mut server, mut client) = pair();
        client.write_all(&[b'x'; 64]).expect("write should succeed");

        let request = read_request(&mut server, Duration::from_secs(2), 16)
            .expect("request should arrive");
        match request {
            Request::Raw(bytes) => assert!(!bytes.is_empty() && bytes.len() <= 16),
            Request::Empty => panic!("expected raw bytes"),
        }
    }

    #[test]
    fn empty_literal_is_sentinel() {
        assert_eq!(request_from(b""), Request::Empty);
        assert!(Request::Empty.is_empty());
    }
}
