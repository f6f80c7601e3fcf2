//! Single-client frame streaming responder.
//!
//! The server lives on the render loop's thread. Once per iteration the loop
//! asks [`FrameServer::next_frame_request`] which frame to produce, renders
//! it, and hands the pixels to [`FrameServer::append_frame`], which streams
//! them to the peer as a binary pixmap. The peer can also fetch render info,
//! stash a reconfigure request, or stop the render; all of those flip the
//! shared [`AbortToken`] instead of unwinding through the render loop.
//!
//! [`RenderLoop`] packages that iteration for callers that can render any
//! frame on demand through a [`FrameSource`].

pub mod abort;
pub mod advance;
pub mod changes;
pub mod config;
pub mod error;
pub mod pages;
pub mod render;
pub mod request;
pub mod route;
pub mod session;

pub use abort::AbortToken;
pub use advance::{FrameAdvancer, RangeExhausted};
pub use changes::{ChangeRequest, ChangeRequestBuffer};
pub use config::{
    RenderRange, ServerConfig, DEFAULT_MAX_CHANGE_REQUEST_LEN, DEFAULT_MAX_REQUEST_SIZE,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{Result, ServerError};
pub use render::{FrameSource, RenderLoop, RenderSummary, RenderedFrame};
pub use request::{read_request, Request};
pub use route::{route, RouteContext, RouteDecision, StreamMode};
pub use session::FrameServer;
