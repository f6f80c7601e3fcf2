use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use frameserv_pixmap::{HttpHead, PixmapReader};
use tracing::debug;

use crate::cmd::ClientArgs;
use crate::exit::{io_error, pixmap_error, CliError, CliResult, FAILURE, TRANSPORT_ERROR};

/// An open response: the parsed head plus a reader positioned at the body.
pub struct Response {
    pub head: HttpHead,
    pub body: PixmapReader<TcpStream>,
}

/// Send `GET <path>` to the frame server and read the response head.
pub fn get(args: &ClientArgs, path: &str) -> CliResult<Response> {
    let addr = resolve(&args.host, args.port)?;
    let mut stream = TcpStream::connect_timeout(&addr, args.timeout)
        .map_err(|err| io_error(&format!("connect to {addr} failed"), err))?;
    set_timeouts(&stream, args.timeout)?;

    debug!(%addr, path, "sending request");
    stream
        .write_all(format!("GET {path} HTTP/1.0\r\n\r\n").as_bytes())
        .map_err(|err| io_error("request failed", err))?;

    let mut body = PixmapReader::new(stream);
    let head = body.read_http_head().map_err(|err| match err {
        frameserv_pixmap::PixmapError::ConnectionClosed => CliError::new(
            FAILURE,
            format!("server closed the connection without answering {path}"),
        ),
        other => pixmap_error("invalid response", other),
    })?;
    match head.status_code() {
        Some(200) => Ok(Response { head, body }),
        _ => Err(CliError::new(
            FAILURE,
            format!("unexpected response: {}", head.status_line),
        )),
    }
}

/// Read a text body to the end of the connection.
pub fn text_body(response: &mut Response) -> CliResult<String> {
    let body = response
        .body
        .read_body_to_end()
        .map_err(|err| pixmap_error("failed to read response", err))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn resolve(host: &str, port: u16) -> CliResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|err| io_error(&format!("cannot resolve {host}"), err))?
        .next()
        .ok_or_else(|| CliError::new(TRANSPORT_ERROR, format!("no address for {host}")))
}

fn set_timeouts(stream: &TcpStream, timeout: Duration) -> CliResult<()> {
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|()| stream.set_write_timeout(Some(timeout)))
        .map_err(|err| io_error("socket setup failed", err))
}
