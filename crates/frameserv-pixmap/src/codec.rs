use bytes::{Buf, BufMut, BytesMut};

use crate::error::{PixmapError, Result};

/// Binary pixmap magic.
pub const MAGIC: [u8; 2] = *b"P6";

/// Comment line written after the magic.
pub const CREATOR_COMMENT: &str = "# Creator: frameserv";

/// Maximum channel value; samples are always 8-bit.
pub const MAX_CHANNEL_VALUE: u32 = 255;

/// Bytes per pixel in the rendered source buffer (R, G, B, A).
pub const SOURCE_BYTES_PER_PIXEL: usize = 4;

/// Bytes per pixel on the wire (R, G, B).
pub const WIRE_BYTES_PER_PIXEL: usize = 3;

/// HTTP response head sent before the first pixmap of a connection.
pub const HTTP_IMAGE_HEADER: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: image/ppm\r\nConnection: close\r\n\r\n";

/// Dimensions carried by a pixmap header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixmapHeader {
    pub width: u32,
    pub height: u32,
}

impl PixmapHeader {
    /// Create a header, rejecting empty images.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PixmapError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Bytes in one encoded row.
    pub fn row_size(&self) -> usize {
        self.width as usize * WIRE_BYTES_PER_PIXEL
    }

    /// Bytes of row data following the header.
    pub fn data_size(&self) -> usize {
        self.row_size() * self.height as usize
    }

    /// Append the text header to `dst`.
    ///
    /// ```text
    /// P6
    /// # Creator: frameserv
    /// <width> <height>
    /// 255
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        let text = format!(
            "P6\n{CREATOR_COMMENT}\n{} {}\n{MAX_CHANNEL_VALUE}\n",
            self.width, self.height
        );
        dst.reserve(text.len());
        dst.put_slice(text.as_bytes());
    }
}

/// Decode a pixmap header from the front of `src`.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete header yet.
/// On success, consumes the header bytes (including the single whitespace
/// byte that separates it from the row data).
pub fn decode_header(src: &mut BytesMut) -> Result<Option<PixmapHeader>> {
    if src.len() < MAGIC.len() {
        return Ok(None);
    }
    if src[..MAGIC.len()] != MAGIC {
        return Err(PixmapError::InvalidMagic);
    }

    let mut pos = MAGIC.len();
    let mut values = [0u32; 3];

    for value in values.iter_mut() {
        // Whitespace and `#` comments may appear between any two fields.
        loop {
            match src.get(pos) {
                None => return Ok(None),
                Some(b'#') => match src[pos..].iter().position(|&b| b == b'\n') {
                    Some(offset) => pos += offset + 1,
                    None => return Ok(None),
                },
                Some(b) if b.is_ascii_whitespace() => pos += 1,
                Some(_) => break,
            }
        }

        let start = pos;
        while src.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        if pos == src.len() {
            return Ok(None);
        }
        if pos == start {
            return Err(PixmapError::InvalidHeader(format!(
                "expected a number at byte {start}"
            )));
        }

        *value = parse_decimal(&src[start..pos])?;
    }

    // Exactly one whitespace byte separates the header from the samples.
    if !src[pos].is_ascii_whitespace() {
        return Err(PixmapError::InvalidHeader(format!(
            "expected whitespace after max value at byte {pos}"
        )));
    }
    pos += 1;

    let [width, height, max_value] = values;
    if max_value != MAX_CHANNEL_VALUE {
        return Err(PixmapError::InvalidHeader(format!(
            "unsupported max channel value {max_value}"
        )));
    }
    let header = PixmapHeader::new(width, height)?;

    src.advance(pos);
    Ok(Some(header))
}

fn parse_decimal(digits: &[u8]) -> Result<u32> {
    digits.iter().try_fold(0u32, |acc, &d| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(u32::from(d - b'0')))
            .ok_or_else(|| PixmapError::InvalidHeader("header value out of range".to_string()))
    })
}

/// A rendered RGBA frame borrowed from the renderer for one encode call.
///
/// Rows are stored bottom-up: the first `width * 4` bytes are the lowest
/// row of the picture.
#[derive(Debug, Clone, Copy)]
pub struct RgbaImage<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> RgbaImage<'a> {
    /// Wrap a pixel buffer, checking it holds exactly `width * height` pixels.
    pub fn new(pixels: &'a [u8], width: u32, height: u32) -> Result<Self> {
        PixmapHeader::new(width, height)?;

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(SOURCE_BYTES_PER_PIXEL))
            .ok_or(PixmapError::InvalidDimensions { width, height })?;
        if pixels.len() != expected {
            return Err(PixmapError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Header describing this image on the wire.
    pub fn header(&self) -> PixmapHeader {
        PixmapHeader {
            width: self.width,
            height: self.height,
        }
    }

    /// Source rows in wire order: the last buffer row comes out first.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let stride = self.width as usize * SOURCE_BYTES_PER_PIXEL;
        self.pixels.chunks_exact(stride).rev()
    }
}

/// Append one source row to `dst` as RGB triplets, dropping alpha.
pub fn encode_row(src_row: &[u8], dst: &mut BytesMut) {
    dst.reserve(src_row.len() / SOURCE_BYTES_PER_PIXEL * WIRE_BYTES_PER_PIXEL);
    for pixel in src_row.chunks_exact(SOURCE_BYTES_PER_PIXEL) {
        dst.put_slice(&pixel[..WIRE_BYTES_PER_PIXEL]);
    }
}

/// Encode a whole image (header and rows) into `dst`.
pub fn encode_pixmap(image: &RgbaImage<'_>, dst: &mut BytesMut) {
    let header = image.header();
    dst.reserve(header.data_size() + 64);
    header.encode(dst);
    for row in image.rows_top_down() {
        encode_row(row, dst);
    }
}
