use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{decode_header, PixmapHeader};
use crate::error::{PixmapError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;
const MAX_HTTP_HEAD_SIZE: usize = 16 * 1024;

/// Status line and headers of an HTTP-style response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHead {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
}

impl HttpHead {
    /// Numeric status code from the status line, if well-formed.
    pub fn status_code(&self) -> Option<u16> {
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A decoded pixmap: dimensions plus top-down RGB rows.
#[derive(Debug, Clone)]
pub struct Pixmap {
    pub header: PixmapHeader,
    pub rgb: Bytes,
}

impl Pixmap {
    /// RGB bytes of row `y`, counted from the top of the picture.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.header.height {
            return None;
        }
        let size = self.header.row_size();
        let start = y as usize * size;
        Some(&self.rgb[start..start + size])
    }

    /// Re-encode as a standalone pixmap file (header plus rows).
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.rgb.len() + 64);
        self.header.encode(&mut out);
        out.extend_from_slice(&self.rgb);
        out.freeze()
    }
}

/// Reads frame server responses from any `Read` stream.
///
/// Handles partial reads internally; callers get a complete HTTP head or a
/// complete pixmap, and can call [`read_pixmap`](Self::read_pixmap) again to
/// follow a continuous stream.
pub struct PixmapReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> PixmapReader<T> {
    /// Create a new reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the response head up to the blank line.
    pub fn read_http_head(&mut self) -> Result<HttpHead> {
        loop {
            if let Some(end) = find_subsequence(&self.buf, b"\r\n\r\n") {
                let head = self.buf.split_to(end + 4);
                return parse_http_head(&head[..end]);
            }
            if self.buf.len() > MAX_HTTP_HEAD_SIZE {
                return Err(PixmapError::InvalidHeader(format!(
                    "response head exceeds {MAX_HTTP_HEAD_SIZE} bytes"
                )));
            }
            self.fill()?;
        }
    }

    /// Read the next complete pixmap (blocking).
    ///
    /// Returns `Err(PixmapError::ConnectionClosed)` when EOF is reached first.
    pub fn read_pixmap(&mut self) -> Result<Pixmap> {
        let header = loop {
            if let Some(header) = decode_header(&mut self.buf)? {
                break header;
            }
            self.fill()?;
        };

        let size = header.data_size();
        while self.buf.len() < size {
            self.fill()?;
        }
        let rgb = self.buf.split_to(size).freeze();

        Ok(Pixmap { header, rgb })
    }

    /// Read everything until the peer closes the connection.
    pub fn read_body_to_end(&mut self) -> Result<Bytes> {
        loop {
            match self.fill() {
                Ok(()) => continue,
                Err(PixmapError::ConnectionClosed) => break,
                Err(err) => return Err(err),
            }
        }
        let len = self.buf.len();
        Ok(self.buf.split_to(len).freeze())
    }

    /// Bytes buffered but not consumed yet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(PixmapError::ConnectionClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PixmapError::Io(err)),
            }
        }
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_http_head(raw: &[u8]) -> Result<HttpHead> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| PixmapError::InvalidHeader("response head is not UTF-8".to_string()))?;
    let mut lines = text.split("\r\n");

    let status_line = lines
        .next()
        .filter(|line| line.starts_with("HTTP/"))
        .ok_or_else(|| PixmapError::InvalidHeader("missing status line".to_string()))?
        .to_string();

    let headers = lines
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(':') {
            Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
            None => Err(PixmapError::InvalidHeader(format!(
                "malformed header line: {line}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(HttpHead {
        status_line,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{encode_pixmap, RgbaImage, HTTP_IMAGE_HEADER};

    fn wire_for(width: u32, height: u32, frames: usize) -> Vec<u8> {
        let pixels: Vec<u8> = (0..width * height * 4).map(|i| i as u8).collect();
        let image = RgbaImage::new(&pixels, width, height).unwrap();
        let mut wire = BytesMut::from(HTTP_IMAGE_HEADER);
        for _ in 0..frames {
            encode_pixmap(&image, &mut wire);
        }
        wire.to_vec()
    }

    #[test]
    fn reads_head_and_pixmap() {
        let mut reader = PixmapReader::new(Cursor::new(wire_for(5, 4, 1)));

        let head = reader.read_http_head().unwrap();
        assert_eq!(head.status_code(), Some(200));
        assert_eq!(head.header("content-type"), Some("image/ppm"));
        assert_eq!(head.header("Connection"), Some("close"));

        let pixmap = reader.read_pixmap().unwrap();
        assert_eq!((pixmap.header.width, pixmap.header.height), (5, 4));
        assert_eq!(pixmap.rgb.len(), 3 * 5 * 4);
    }

    #[test]
    fn follows_a_continuous_stream() {
        let mut reader = PixmapReader::new(Cursor::new(wire_for(2, 2, 3)));
        reader.read_http_head().unwrap();

        for _ in 0..3 {
            let pixmap = reader.read_pixmap().unwrap();
            assert_eq!(pixmap.rgb.len(), 12);
        }
        assert!(matches!(
            reader.read_pixmap(),
            Err(PixmapError::ConnectionClosed)
        ));
    }

    #[test]
    fn byte_by_byte_delivery() {
        let reader_impl = ByteByByteReader {
            bytes: wire_for(3, 2, 1),
            pos: 0,
        };
        let mut reader = PixmapReader::new(reader_impl);

        reader.read_http_head().unwrap();
        let pixmap = reader.read_pixmap().unwrap();
        assert_eq!(pixmap.header, PixmapHeader::new(3, 2).unwrap());
    }

    #[test]
    fn truncated_rows_report_closed() {
        let mut wire = wire_for(4, 4, 1);
        wire.truncate(wire.len() - 5);
        let mut reader = PixmapReader::new(Cursor::new(wire));
        reader.read_http_head().unwrap();
        assert!(matches!(
            reader.read_pixmap(),
            Err(PixmapError::ConnectionClosed)
        ));
    }

    #[test]
    fn row_accessor_is_top_down() {
        // Source row 1 (the top of a 1x2 picture) is (4, 5, 6).
        let pixels = [1u8, 2, 3, 0, 4, 5, 6, 0];
        let image = RgbaImage::new(&pixels, 1, 2).unwrap();
        let mut wire = BytesMut::new();
        encode_pixmap(&image, &mut wire);

        let mut reader = PixmapReader::new(Cursor::new(wire.to_vec()));
        let pixmap = reader.read_pixmap().unwrap();
        assert_eq!(pixmap.row(0), Some(&[4u8, 5, 6][..]));
        assert_eq!(pixmap.row(1), Some(&[1u8, 2, 3][..]));
        assert_eq!(pixmap.row(2), None);
    }

    #[test]
    fn saved_pixmap_decodes_again() {
        let mut reader = PixmapReader::new(Cursor::new(wire_for(4, 3, 1)));
        reader.read_http_head().unwrap();
        let pixmap = reader.read_pixmap().unwrap();

        let mut saved = PixmapReader::new(Cursor::new(pixmap.to_bytes().to_vec()));
        let again = saved.read_pixmap().unwrap();
        assert_eq!(again.header, pixmap.header);
        assert_eq!(again.rgb, pixmap.rgb);
    }

    #[test]
    fn text_body_read_to_end() {
        let wire = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nok\n".to_vec();
        let mut reader = PixmapReader::new(Cursor::new(wire));
        let head = reader.read_http_head().unwrap();
        assert_eq!(head.header("Content-Type"), Some("text/plain"));
        assert_eq!(reader.read_body_to_end().unwrap().as_ref(), b"ok\n");
    }

    #[test]
    fn rejects_non_http_head() {
        let mut reader = PixmapReader::new(Cursor::new(b"P6\r\n\r\n".to_vec()));
        assert!(matches!(
            reader.read_http_head(),
            Err(PixmapError::InvalidHeader(_))
        ));
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }
}
