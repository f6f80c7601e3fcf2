//! Single-client frame streaming responder for render pipelines.
//!
//! frameserv sits inside a render loop and streams each rendered frame to a
//! TCP peer as a binary pixmap, answering a small HTTP-like protocol: render
//! info, single frames, a continuous stream of the whole range, reconfigure
//! requests and a stop command.
//!
//! # Crate Structure
//!
//! - [`transport`] - TCP listening socket, peer stream, network subsystem guard
//! - [`pixmap`] - Pixmap codec, streaming writer and client-side reader
//! - [`server`] - Request routing, frame advancing and the render-loop driver (behind `server` feature)

/// Re-export transport types.
pub mod transport {
    pub use frameserv_transport::*;
}

/// Re-export pixmap types.
pub mod pixmap {
    pub use frameserv_pixmap::*;
}

/// Re-export server types (requires `server` feature).
#[cfg(feature = "server")]
pub mod server {
    pub use frameserv_server::*;
}
