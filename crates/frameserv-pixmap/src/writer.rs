use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_row, RgbaImage, HTTP_IMAGE_HEADER};
use crate::error::{PixmapError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Streams complete pixmaps to any `Write` sink.
///
/// Each row is converted into a reusable buffer and pushed out with a
/// retrying full write, so a slow peer only ever sees short writes resumed,
/// never dropped bytes.
pub struct PixmapWriter<T> {
    inner: T,
    buf: BytesMut,
    bytes_written: u64,
}

impl<T: Write> PixmapWriter<T> {
    /// Create a new pixmap writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            bytes_written: 0,
        }
    }

    /// Write the `200 OK` / `image/ppm` response head.
    pub fn write_http_header(&mut self) -> Result<()> {
        self.bytes_written += write_fully(&mut self.inner, HTTP_IMAGE_HEADER)? as u64;
        Ok(())
    }

    /// Write one frame: optional HTTP head, pixmap header, then every row
    /// top-down (blocking).
    pub fn write_image(&mut self, image: &RgbaImage<'_>, include_http_header: bool) -> Result<()> {
        if include_http_header {
            self.write_http_header()?;
        }

        self.buf.clear();
        image.header().encode(&mut self.buf);
        self.bytes_written += write_fully(&mut self.inner, &self.buf)? as u64;

        for row in image.rows_top_down() {
            self.buf.clear();
            encode_row(row, &mut self.buf);
            self.bytes_written += write_fully(&mut self.inner, &self.buf)? as u64;
        }

        trace!(
            width = image.width(),
            height = image.height(),
            bytes_written = self.bytes_written,
            "pixmap written"
        );
        self.flush()
    }

    /// Write raw bytes with the same retry semantics as frame data.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes_written += write_fully(&mut self.inner, bytes)? as u64;
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PixmapError::Io(err)),
            }
        }
    }

    /// Total bytes handed to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Issue writes until every byte is accepted or a write fails.
fn write_fully<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<usize> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(PixmapError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(PixmapError::Io(err)),
        }
    }
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{decode_header, encode_pixmap};

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i % 251) as u8;
                [v, v.wrapping_add(1), v.wrapping_add(2), 0xFF]
            })
            .collect()
    }

    #[test]
    fn writes_http_head_then_pixmap() {
        let pixels = gradient(4, 3);
        let image = RgbaImage::new(&pixels, 4, 3).unwrap();
        let mut writer = PixmapWriter::new(Cursor::new(Vec::new()));

        writer.write_image(&image, true).unwrap();

        let wire = writer.into_inner().into_inner();
        assert!(wire.starts_with(HTTP_IMAGE_HEADER));

        let mut expected = BytesMut::from(HTTP_IMAGE_HEADER);
        encode_pixmap(&image, &mut expected);
        assert_eq!(wire, expected.to_vec());
    }

    #[test]
    fn omits_http_head_when_asked() {
        let pixels = gradient(2, 2);
        let image = RgbaImage::new(&pixels, 2, 2).unwrap();
        let mut writer = PixmapWriter::new(Cursor::new(Vec::new()));

        writer.write_image(&image, false).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let header = decode_header(&mut wire).unwrap().unwrap();
        assert_eq!((header.width, header.height), (2, 2));
        assert_eq!(wire.len(), 12);
    }

    #[test]
    fn consecutive_frames_share_one_head() {
        let pixels = gradient(2, 1);
        let image = RgbaImage::new(&pixels, 2, 1).unwrap();
        let mut writer = PixmapWriter::new(Cursor::new(Vec::new()));

        writer.write_image(&image, true).unwrap();
        writer.write_image(&image, false).unwrap();

        let wire = writer.into_inner().into_inner();
        let text = String::from_utf8_lossy(&wire);
        assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 1);
        assert_eq!(text.matches("P6\n").count(), 2);
    }

    #[test]
    fn short_writes_are_resumed() {
        let pixels = gradient(16, 8);
        let image = RgbaImage::new(&pixels, 16, 8).unwrap();
        let mut writer = PixmapWriter::new(TrickleWriter {
            max_chunk: 5,
            data: Vec::new(),
        });

        writer.write_image(&image, true).unwrap();

        let mut expected = BytesMut::from(HTTP_IMAGE_HEADER);
        encode_pixmap(&image, &mut expected);
        assert_eq!(writer.get_ref().data, expected.to_vec());
        assert_eq!(writer.bytes_written(), expected.len() as u64);
    }

    #[test]
    fn interrupted_writes_are_retried() {
        let pixels = gradient(3, 3);
        let image = RgbaImage::new(&pixels, 3, 3).unwrap();
        let mut writer = PixmapWriter::new(InterruptOnce {
            interrupted: false,
            data: Vec::new(),
        });

        writer.write_image(&image, false).unwrap();
        assert!(writer.get_ref().interrupted);
        assert!(!writer.get_ref().data.is_empty());
    }

    #[test]
    fn failure_after_any_row_is_reported() {
        let height = 6u32;
        let pixels = gradient(4, height);
        let image = RgbaImage::new(&pixels, 4, height).unwrap();

        // Call 0 is the HTTP head, call 1 the pixmap header, then one per row.
        for fail_at in 0..(height as usize + 2) {
            let mut writer = PixmapWriter::new(FailAfter {
                remaining_ok: fail_at,
            });
            let err = writer.write_image(&image, true).unwrap_err();
            assert!(
                matches!(err, PixmapError::Io(ref e) if e.kind() == ErrorKind::BrokenPipe),
                "unexpected error at call {fail_at}: {err}"
            );
        }
    }

    #[test]
    fn zero_length_write_means_closed() {
        let pixels = gradient(1, 1);
        let image = RgbaImage::new(&pixels, 1, 1).unwrap();
        let mut writer = PixmapWriter::new(ZeroWriter);
        let err = writer.write_image(&image, false).unwrap_err();
        assert!(matches!(err, PixmapError::ConnectionClosed));
    }

    struct TrickleWriter {
        max_chunk: usize,
        data: Vec<u8>,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.max_chunk);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct FailAfter {
        remaining_ok: usize,
    }

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.remaining_ok == 0 {
                return Err(std::io::Error::from(ErrorKind::BrokenPipe));
            }
            self.remaining_ok -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
