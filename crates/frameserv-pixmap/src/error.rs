/// Errors that can occur while encoding, streaming or decoding pixmaps.
#[derive(Debug, thiserror::Error)]
pub enum PixmapError {
    /// The pixel buffer does not hold `width * height` RGBA pixels.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Zero or overflowing image dimensions.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The stream does not start with the binary pixmap magic.
    #[error("invalid pixmap magic (expected \"P6\")")]
    InvalidMagic,

    /// The pixmap or HTTP response header could not be parsed.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// An I/O error occurred while reading or writing.
    #[error("pixmap I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before the transfer completed.
    #[error("connection closed (incomplete transfer)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, PixmapError>;
