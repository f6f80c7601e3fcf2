use std::io::{self, ErrorKind};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

/// Block until `sock` is readable, or until `timeout` elapses.
///
/// For a listening socket "readable" means a connection is pending. A peer
/// that hung up also counts as readable; the following read reports it.
/// `None` waits indefinitely. Returns `Ok(false)` only when the budget ran out.
pub(crate) fn wait_readable<S: AsRawFd>(sock: &S, timeout: Option<Duration>) -> io::Result<bool> {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        let timeout_ms = match deadline {
            None => -1,
            Some(deadline) => millis_until(deadline),
        };

        let mut pfd = libc::pollfd {
            fd: sock.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        // SAFETY: `pfd` is a single valid pollfd for the duration of the call and
        // `fd` is an open socket descriptor borrowed from `sock`.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

        if rc > 0 {
            return Ok(true);
        }
        if rc == 0 {
            return Ok(false);
        }

        let err = io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            continue;
        }
        return Err(err);
    }
}

fn millis_until(deadline: Instant) -> libc::c_int {
    let remaining = deadline.saturating_duration_since(Instant::now());
    let mut ms = remaining.as_millis();
    // Round up so a sub-millisecond remainder does not turn into a busy poll.
    if Duration::from_millis(ms as u64) < remaining {
        ms += 1;
    }
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    use super::*;

    #[test]
    fn times_out_without_data() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();

        let start = Instant::now();
        let ready = wait_readable(&server, Some(Duration::from_millis(50))).unwrap();
        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn reports_ready_when_data_arrives() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();

        client.write_all(b"GET / HTTP/1.0\r\n").unwrap();
        assert!(wait_readable(&server, Some(Duration::from_secs(2))).unwrap());
    }

    #[test]
    fn pending_connection_makes_listener_readable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        assert!(!wait_readable(&listener, Some(Duration::ZERO)).unwrap());

        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        assert!(wait_readable(&listener, Some(Duration::from_secs(2))).unwrap());
    }

    #[test]
    fn millis_round_up() {
        let deadline = Instant::now() + Duration::from_secs(10) + Duration::from_micros(1);
        assert!((10_000..=10_001).contains(&millis_until(deadline)));
        assert_eq!(millis_until(Instant::now()), 0);
    }
}
