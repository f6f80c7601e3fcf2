use std::sync::atomic::{AtomicUsize, Ordering};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::error::{Result, TransportError};

static ACTIVE_GUARDS: AtomicUsize = AtomicUsize::new(0);

/// Scoped hold on the host socket layer.
///
/// Acquire one before opening a listening socket and keep it alive for as
/// long as the socket exists. Release happens on drop, so every exit path
/// (including early error returns) tears the subsystem down again.
///
/// Acquiring opens and closes a throwaway TCP socket, so a host that cannot
/// create sockets at all (no socket support, descriptor table exhausted)
/// reports [`TransportError::Startup`] here instead of a bind failure later.
/// The guard also tracks how many holders are live so teardown ordering can
/// be observed in logs.
#[derive(Debug)]
pub struct NetworkSubsystem {
    _private: (),
}

impl NetworkSubsystem {
    /// Acquire the network subsystem.
    pub fn acquire() -> Result<Self> {
        check_socket_layer().map_err(startup_error)?;
        let holders = ACTIVE_GUARDS.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(holders, "network subsystem acquired");
        Ok(Self { _private: () })
    }

    /// Number of guards currently alive in this process.
    pub fn active_holders() -> usize {
        ACTIVE_GUARDS.load(Ordering::SeqCst)
    }
}

fn check_socket_layer() -> std::io::Result<()> {
    Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map(drop)
}

fn startup_error(err: std::io::Error) -> TransportError {
    TransportError::Startup(err.to_string())
}

impl Drop for NetworkSubsystem {
    fn drop(&mut self) {
        let holders = ACTIVE_GUARDS.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        debug!(holders, "network subsystem released");
    }
}
