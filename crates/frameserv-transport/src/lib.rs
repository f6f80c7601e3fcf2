//! TCP transport for the frameserv responder.
//!
//! Provides the socket lifecycle pieces the frame server is built on:
//! - [`TcpServerSocket`]: listening socket with address reuse and bounded accept
//! - [`PeerStream`]: the connected peer, with a bounded readability wait
//! - [`NetworkSubsystem`]: scoped acquire/release of the host socket layer
//!
//! Everything here is blocking. Waits that are interrupted by a signal are
//! resumed with the remaining budget instead of being reported as failures.

pub mod error;
pub mod subsystem;

#[cfg(unix)]
mod poll;
#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod tcp;

pub use error::{Result, TransportError};
pub use subsystem::NetworkSubsystem;

#[cfg(unix)]
pub use stream::PeerStream;
#[cfg(unix)]
pub use tcp::TcpServerSocket;
