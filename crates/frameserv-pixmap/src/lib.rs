//! Binary pixmap encoding and streaming for the frame server.
//!
//! A rendered frame arrives as a packed RGBA buffer whose first row is the
//! bottom of the picture. On the wire it becomes a `P6` pixmap:
//! - a text header: magic, a creator comment, `"<width> <height>"`, `"255"`
//! - `height` rows of `width` RGB triplets, top row first (alpha dropped)
//!
//! The writer retries short writes until the whole frame is out; the reader
//! is the matching client side, used by the CLI and the tests.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_header, encode_pixmap, encode_row, PixmapHeader, RgbaImage, CREATOR_COMMENT,
    HTTP_IMAGE_HEADER, MAGIC, MAX_CHANNEL_VALUE, SOURCE_BYTES_PER_PIXEL, WIRE_BYTES_PER_PIXEL,
};
pub use error::{PixmapError, Result};
pub use reader::{HttpHead, Pixmap, PixmapReader};
pub use writer::PixmapWriter;
