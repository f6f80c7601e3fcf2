use std::time::Duration;

/// Errors that can occur in frame server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error (startup, bind/listen, accept).
    #[error("transport error: {0}")]
    Transport(#[from] frameserv_transport::TransportError),

    /// The frame could not be encoded.
    #[error("pixmap error: {0}")]
    Pixmap(#[from] frameserv_pixmap::PixmapError),

    /// Reading the request from the peer failed.
    #[error("failed to receive request: {0}")]
    Recv(std::io::Error),

    /// Streaming the response to the peer failed; the peer was dropped.
    #[error("failed to send response: {0}")]
    Send(frameserv_pixmap::PixmapError),

    /// The peer closed the connection before sending a request.
    #[error("peer disconnected")]
    Disconnected,

    /// No request arrived within the wait budget.
    #[error("no request within {0:?}")]
    Timeout(Duration),

    /// Render range end precedes its start.
    #[error("invalid render range {start}..={end}")]
    InvalidRange { start: i32, end: i32 },

    /// A render-loop call was made before a render was started.
    #[error("no render in progress")]
    NoRenderSession,
}

impl ServerError {
    /// Failures that just mean "no frame this iteration"; the listening
    /// socket stays up and the caller may try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServerError::Timeout(_) | ServerError::Recv(_) | ServerError::Disconnected => true,
            ServerError::Transport(err) => matches!(
                err,
                frameserv_transport::TransportError::Timeout(_)
                    | frameserv_transport::TransportError::Accept(_)
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
