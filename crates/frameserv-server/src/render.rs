use tracing::{debug, info, warn};

use crate::abort::AbortToken;
use crate::config::RenderRange;
use crate::error::Result;
use crate::session::FrameServer;

/// One rendered frame: bottom-up RGBA rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Produces pixel buffers for frame numbers on demand.
pub trait FrameSource {
    type Error: std::fmt::Display;

    fn render(&mut self, frame: i32) -> std::result::Result<RenderedFrame, Self::Error>;
}

/// What a finished render loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Frames rendered and streamed to a peer.
    pub frames_served: u64,
    /// Requests answered without a frame (pages, unknown paths).
    pub requests_answered: u64,
    /// Frame requests outside the render range.
    pub requests_dropped: u64,
    /// Whether the loop stopped on the abort token.
    pub aborted: bool,
}

/// Drives a [`FrameServer`] the way a render pipeline does.
///
/// Each frame slot of the range asks the server for a frame number until an
/// in-range one arrives, renders it and appends it. The loop ends after as
/// many frames as the range holds, or earlier once the abort token is set.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    range: RenderRange,
    width: u32,
    height: u32,
    abort: AbortToken,
}

impl RenderLoop {
    pub fn new(range: RenderRange, width: u32, height: u32) -> Self {
        Self {
            range,
            width,
            height,
            abort: AbortToken::new(),
        }
    }

    /// Use an externally owned abort token (e.g. one a signal handler sets).
    pub fn with_abort(mut self, abort: AbortToken) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }

    /// Serve the whole render. Startup failures are returned; everything
    /// after that is logged and absorbed.
    pub fn run<S: FrameSource>(&self, server: &mut FrameServer, source: &mut S) -> Result<RenderSummary> {
        server.start_listening()?;
        server.begin_render(self.range, self.width, self.height, self.abort.clone())?;

        let mut summary = RenderSummary::default();
        'slots: for _ in 0..self.range.len() {
            let frame = loop {
                if self.abort.is_triggered() {
                    break 'slots;
                }
                match server.next_frame_request() {
                    Ok(Some(frame)) if self.range.contains(frame) => break frame,
                    Ok(Some(frame)) => {
                        debug!(frame, "requested frame outside render range");
                        server.discard_pending_frame();
                        summary.requests_dropped += 1;
                    }
                    Ok(None) => summary.requests_answered += 1,
                    Err(err) if err.is_retryable() => debug!(error = %err, "no frame this iteration"),
                    Err(err) => warn!(error = %err, "frame request failed"),
                }
            };

            let rendered = match source.render(frame) {
                Ok(rendered) => rendered,
                Err(err) => {
                    warn!(frame, error = %err, "frame source failed");
                    server.discard_pending_frame();
                    continue;
                }
            };
            match server.append_frame(&rendered.pixels, rendered.width, rendered.height, frame) {
                Ok(true) => summary.frames_served += 1,
                Ok(false) => {}
                Err(err) => warn!(frame, error = %err, "frame not delivered"),
            }
        }

        summary.aborted = self.abort.is_triggered();
        server.end_render();
        info!(
            frames_served = summary.frames_served,
            requests_answered = summary.requests_answered,
            aborted = summary.aborted,
            "render loop finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
    use std::thread;
    use std::time::Duration;

    use frameserv_pixmap::{PixmapError, PixmapReader};

    use super::*;
    use crate::config::ServerConfig;

    struct Flat {
        width: u32,
        height: u32,
        rendered: Vec<i32>,
    }

    impl FrameSource for Flat {
        type Error = String;

        fn render(&mut self, frame: i32) -> std::result::Result<RenderedFrame, String> {
            self.rendered.push(frame);
            Ok(RenderedFrame {
                pixels: vec![frame as u8; (self.width * self.height * 4) as usize],
                width: self.width,
                height: self.height,
            })
        }
    }

    fn server() -> FrameServer {
        FrameServer::new(
            ServerConfig::default()
                .with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
                .with_port(0)
                .with_request_timeout(Duration::from_secs(5))
                .with_accept_timeout(Some(Duration::from_millis(50))),
        )
    }

    fn request(addr: SocketAddr, path: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).expect("client should connect");
        stream
            .write_all(format!("GET {path} HTTP/1.0\r\n\r\n").as_bytes())
            .expect("request should be sent");
        stream
    }

    #[test]
    fn continuous_client_receives_whole_range() {
        let mut server = server();
        let addr = server.start_listening().expect("server should listen");
        let client = thread::spawn(move || {
            let mut reader = PixmapReader::new(request(addr, "/images/ppm/all"));
            reader.read_http_head().expect("http head");
            let mut frames = Vec::new();
            loop {
                match reader.read_pixmap() {
                    Ok(pixmap) => frames.push(pixmap.rgb[0] as i32),
                    Err(PixmapError::ConnectionClosed) => break,
                    Err(err) => panic!("unexpected error: {err}"),
                }
            }
            frames
        });

        let range = RenderRange::new(1, 4, 24).expect("range should be valid");
        let mut source = Flat {
            width: 2,
            height: 2,
            rendered: Vec::new(),
        };
        let summary = RenderLoop::new(range, 2, 2)
            .run(&mut server, &mut source)
            .expect("render should run");

        assert_eq!(summary.frames_served, 4);
        assert_eq!(source.rendered, vec![1, 2, 3, 4]);
        assert_eq!(client.join().expect("client thread"), vec![1, 2, 3, 4]);
        assert!(!server.has_peer());
        assert!(server.is_listening());
    }

    #[test]
    fn out_of_range_requests_are_dropped() {
        let mut server = server();
        let addr = server.start_listening().expect("server should listen");
        let client = thread::spawn(move || {
            let mut rejected = Vec::new();
            request(addr, "/images/ppm/99")
                .read_to_end(&mut rejected)
                .expect("read to end");

            let mut reader = PixmapReader::new(request(addr, "/images/ppm/2"));
            reader.read_http_head().expect("http head");
            let pixmap = reader.read_pixmap().expect("pixmap");

            let mut bye = Vec::new();
            request(addr, "/close.txt")
                .read_to_end(&mut bye)
                .expect("read to end");
            (rejected, pixmap.rgb[0], bye)
        });

        let range = RenderRange::new(1, 3, 24).expect("range should be valid");
        let abort = AbortToken::new();
        let mut source = Flat {
            width: 1,
            height: 1,
            rendered: Vec::new(),
        };
        let summary = RenderLoop::new(range, 1, 1)
            .with_abort(abort.clone())
            .run(&mut server, &mut source)
            .expect("render should run");

        let (rejected, first_byte, bye) = client.join().expect("client thread");
        assert!(rejected.is_empty());
        assert_eq!(first_byte, 2);
        assert!(String::from_utf8_lossy(&bye).contains("Goodbye"));

        assert_eq!(source.rendered, vec![2]);
        assert_eq!(summary.frames_served, 1);
        assert_eq!(summary.requests_dropped, 1);
        assert_eq!(summary.requests_answered, 1);
        assert!(summary.aborted);
        assert!(abort.is_triggered());
    }

    #[test]
    fn pre_aborted_render_serves_nothing() {
        let mut server = server();
        let abort = AbortToken::new();
        abort.trigger();
        let range = RenderRange::new(1, 3, 24).expect("range should be valid");
        let mut source = Flat {
            width: 1,
            height: 1,
            rendered: Vec::new(),
        };
        let summary = RenderLoop::new(range, 1, 1)
            .with_abort(abort)
            .run(&mut server, &mut source)
            .expect("render should run");
        assert_eq!(summary.frames_served, 0);
        assert!(summary.aborted);
        assert!(source.rendered.is_empty());
    }
}
