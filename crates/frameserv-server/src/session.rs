use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use frameserv_pixmap::{PixmapHeader, PixmapWriter, RgbaImage};
use frameserv_transport::{NetworkSubsystem, PeerStream, TcpServerSocket, TransportError};
use tracing::{debug, info, warn};

use crate::abort::AbortToken;
use crate::advance::FrameAdvancer;
use crate::changes::ChangeRequestBuffer;
use crate::config::{RenderRange, ServerConfig};
use crate::error::{Result, ServerError};
use crate::pages;
use crate::request::{read_request, Request};
use crate::route::{route, RouteContext, RouteDecision, StreamMode};

/// The connected peer and what has happened on its connection so far.
struct Connection {
    writer: PixmapWriter<PeerStream>,
    header_sent: bool,
    first_request_read: bool,
}

/// Range, dimensions and cursor of the render in progress.
struct RenderSession {
    advancer: FrameAdvancer,
    width: u32,
    height: u32,
}

/// Single-client frame streaming responder.
///
/// Owns the listening socket, at most one peer connection, and the state of
/// the render it serves. Everything runs on the caller's thread: the render
/// loop calls [`next_frame_request`](Self::next_frame_request) once per
/// iteration, renders the returned frame and hands it back through
/// [`append_frame`](Self::append_frame).
///
/// Nothing stops a process from creating several servers on different
/// ports; the C interface keeps exactly one per process.
pub struct FrameServer {
    config: ServerConfig,
    socket: Option<TcpServerSocket>,
    subsystem: Option<NetworkSubsystem>,
    peer: Option<Connection>,
    render: Option<RenderSession>,
    default_mode: StreamMode,
    mode: StreamMode,
    pending_frame: Option<i32>,
    changes: ChangeRequestBuffer,
    abort: AbortToken,
}

impl FrameServer {
    pub fn new(config: ServerConfig) -> Self {
        let changes = ChangeRequestBuffer::new(config.max_change_request_len);
        Self {
            config,
            socket: None,
            subsystem: None,
            peer: None,
            render: None,
            default_mode: StreamMode::SingleFrame,
            mode: StreamMode::SingleFrame,
            pending_frame: None,
            changes,
            abort: AbortToken::new(),
        }
    }

    /// Store reconfigure requests in an existing buffer, so they outlive this server.
    pub fn with_change_requests(mut self, changes: ChangeRequestBuffer) -> Self {
        self.changes = changes;
        self
    }

    /// Bind and listen on the configured address.
    ///
    /// A no-op returning the current address when already listening.
    pub fn start_listening(&mut self) -> Result<SocketAddr> {
        if let Some(socket) = &self.socket {
            return Ok(socket.local_addr());
        }

        let subsystem = NetworkSubsystem::acquire()?;
        let socket = TcpServerSocket::bind_addr(self.config.socket_addr())?;
        let addr = socket.local_addr();

        self.subsystem = Some(subsystem);
        self.socket = Some(socket);
        Ok(addr)
    }

    /// Make sure a peer is connected, waiting up to `timeout` for one.
    ///
    /// Returns at once when a peer is already connected.
    pub fn accept_once(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.peer.is_some() {
            return Ok(());
        }
        let socket = self
            .socket
            .as_ref()
            .ok_or(ServerError::Transport(TransportError::NotListening))?;

        let stream = socket.accept_timeout(timeout)?;
        if let Err(err) = stream.set_nodelay(true) {
            debug!(error = %err, "could not disable nagle on peer");
        }
        self.peer = Some(Connection {
            writer: PixmapWriter::new(stream),
            header_sent: false,
            first_request_read: false,
        });
        Ok(())
    }

    /// Close the peer connection, if any.
    pub fn close_peer(&mut self) {
        if let Some(conn) = self.peer.take() {
            let stream = conn.writer.into_inner();
            debug!(peer = ?stream.peer_addr(), "closing peer connection");
            stream.close();
        }
        self.pending_frame = None;
        self.mode = self.default_mode;
    }

    /// Close the peer and the listening socket, releasing the network subsystem.
    pub fn stop_listening(&mut self) {
        self.close_peer();
        if self.socket.take().is_some() {
            info!("frame server stopped");
        }
        self.subsystem = None;
    }

    /// Start serving a render of `range` at `width` x `height`.
    ///
    /// `abort` is the token the render loop polls; it is triggered when the
    /// range runs out, the peer asks to stop, or streaming fails.
    pub fn begin_render(
        &mut self,
        range: RenderRange,
        width: u32,
        height: u32,
        abort: AbortToken,
    ) -> Result<()> {
        PixmapHeader::new(width, height)?;
        self.abort = abort.clone();
        self.pending_frame = None;
        self.render = Some(RenderSession {
            advancer: FrameAdvancer::new(range, abort),
            width,
            height,
        });
        info!(
            start = range.start(),
            end = range.end(),
            rate = range.frame_rate(),
            width,
            height,
            "render started"
        );
        Ok(())
    }

    /// Wait for the peer's next request and decide which frame to render.
    ///
    /// Returns `Ok(Some(frame))` when a frame must be rendered and passed to
    /// [`append_frame`](Self::append_frame), `Ok(None)` when the request was
    /// answered without a frame. Errors mean no frame this iteration; the
    /// listening socket stays up either way.
    pub fn next_frame_request(&mut self) -> Result<Option<i32>> {
        if self.render.is_none() {
            return Err(ServerError::NoRenderSession);
        }
        self.accept_once(self.config.accept_timeout)?;

        let request = match self.read_next_request() {
            Ok(request) => request,
            Err(err) => {
                self.close_peer();
                return Err(err);
            }
        };

        let decision = {
            let render = self.render.as_mut().ok_or(ServerError::NoRenderSession)?;
            let mut ctx = RouteContext {
                advancer: Some(&mut render.advancer),
                changes: &self.changes,
                abort: &self.abort,
                mode: &mut self.mode,
            };
            route(&request, &mut ctx)
        };
        debug!(?decision, "request routed");

        let page = match decision {
            RouteDecision::Frame(frame) => {
                self.pending_frame = Some(frame);
                return Ok(Some(frame));
            }
            RouteDecision::IndexPage => Some(pages::index_page()),
            RouteDecision::InfoPage => self
                .render
                .as_ref()
                .map(|r| pages::info_page(&r.advancer.range(), r.width, r.height)),
            RouteDecision::Reconfigure { accepted } => Some(pages::reconfigure_page(accepted)),
            RouteDecision::Close => Some(pages::goodbye_page()),
            RouteDecision::NoRoute => None,
        };

        if let (Some(page), Some(conn)) = (page, self.peer.as_mut()) {
            if let Err(err) = conn.writer.write_raw(page.as_bytes()) {
                warn!(error = %err, "failed to send response page");
            }
        }
        self.close_peer();
        Ok(None)
    }

    /// Stream a rendered frame to the peer that asked for it.
    ///
    /// `pixels` is the bottom-up RGBA buffer of the frame. Returns `Ok(false)`
    /// when no frame was pending. A failed write closes the peer and triggers
    /// the abort token.
    pub fn append_frame(&mut self, pixels: &[u8], width: u32, height: u32, frame: i32) -> Result<bool> {
        let Some(pending) = self.pending_frame.take() else {
            return Ok(false);
        };
        if pending != frame {
            debug!(pending, frame, "appending a different frame than requested");
        }
        let Some(conn) = self.peer.as_mut() else {
            return Ok(false);
        };

        let image = match RgbaImage::new(pixels, width, height) {
            Ok(image) => image,
            Err(err) => {
                self.close_peer();
                return Err(err.into());
            }
        };

        let include_http_header = self.mode == StreamMode::SingleFrame || !conn.header_sent;
        if let Err(err) = stream_frame(&mut conn.writer, &image, include_http_header, &self.abort) {
            warn!(frame, error = %err, "frame streaming failed, aborting render");
            self.close_peer();
            return Err(err);
        }
        conn.header_sent = true;
        debug!(frame, width, height, "frame served");

        if self.mode == StreamMode::SingleFrame {
            self.close_peer();
        }
        Ok(true)
    }

    /// Drop a pending frame the render loop cannot produce, closing the peer.
    pub fn discard_pending_frame(&mut self) {
        if let Some(frame) = self.pending_frame.take() {
            debug!(frame, "dropping unservable frame request");
            self.close_peer();
        }
    }

    /// Finish the current render. The listening socket stays open.
    pub fn end_render(&mut self) {
        self.close_peer();
        if self.render.take().is_some() {
            info!("render finished");
        }
    }

    /// Choose between one frame per connection and continuous streaming.
    pub fn set_continuous_mode(&mut self, continuous: bool) {
        self.default_mode = if continuous {
            StreamMode::Continuous
        } else {
            StreamMode::SingleFrame
        };
        self.mode = self.default_mode;
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// The last reconfigure query; empty if none arrived yet.
    pub fn last_change_request(&self) -> String {
        self.changes.get()
    }

    /// Shared handle on the change-request slot.
    pub fn change_requests(&self) -> ChangeRequestBuffer {
        self.changes.clone()
    }

    /// Range of the render in progress.
    pub fn render_range(&self) -> Option<RenderRange> {
        self.render.as_ref().map(|r| r.advancer.range())
    }

    /// Token the render loop polls.
    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().map(TcpServerSocket::local_addr)
    }

    pub fn is_listening(&self) -> bool {
        self.socket.is_some()
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.as_ref().and_then(|c| c.writer.get_ref().peer_addr())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn read_next_request(&mut self) -> Result<Request> {
        let conn = self.peer.as_mut().ok_or(ServerError::Disconnected)?;
        if conn.first_request_read && self.mode == StreamMode::Continuous {
            return Ok(Request::Empty);
        }
        let request = read_request(
            conn.writer.get_mut(),
            self.config.request_timeout,
            self.config.max_request_size,
        )?;
        conn.first_request_read = true;
        Ok(request)
    }
}

impl Drop for FrameServer {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

impl std::fmt::Debug for FrameServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameServer")
            .field("local_addr", &self.local_addr())
            .field("peer", &self.peer_addr())
            .field("mode", &self.mode)
            .field("pending_frame", &self.pending_frame)
            .finish()
    }
}

/// Write one frame; on failure trigger `abort` and report a send error.
fn stream_frame<W: Write>(
    writer: &mut PixmapWriter<W>,
    image: &RgbaImage<'_>,
    include_http_header: bool,
    abort: &AbortToken,
) -> Result<()> {
    writer
        .write_image(image, include_http_header)
        .map_err(|err| {
            abort.trigger();
            ServerError::Send(err)
        })
}
