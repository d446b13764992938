//! A buffered [`Connection`] over any async byte stream.

use std::io;
use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::connection::Connection;
use crate::ensure;

/// Refill size for the internal read buffer.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Maximum accepted length of a single protocol line.
const MAX_LINE_BYTES: usize = 8 * 1024;

/// [`Connection`] implementation over an `AsyncRead + AsyncWrite` transport.
///
/// Reads are buffered through an internal `BytesMut`; writes go straight to
/// the transport. Phase misuse (reading while the read phase is closed,
/// writing while the write phase is closed) is an `io::Error` rather than
/// silent reordering: the caller guarantees ordering, the connection
/// enforces it.
///
/// This implementation serializes nothing across exchanges itself; it is the
/// single-exchange transport used directly or the building block a pooling
/// layer wraps.
#[derive(Debug)]
pub struct DirectConnection<S> {
    io: S,
    read_buffer: BytesMut,
    open: bool,
    writable: bool,
    readable: bool,
    seen_eof: bool,
}

impl<S> DirectConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(io: S) -> Self {
        Self {
            io,
            read_buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            open: true,
            writable: false,
            readable: false,
            seen_eof: false,
        }
    }

    fn ensure_open(&self) -> io::Result<()> {
        ensure!(self.open, io::Error::new(ErrorKind::NotConnected, "connection closed"));
        Ok(())
    }

    fn ensure_readable(&self) -> io::Result<()> {
        self.ensure_open()?;
        ensure!(self.readable, io::Error::new(ErrorKind::InvalidInput, "read phase not started"));
        Ok(())
    }

    fn ensure_writable(&self) -> io::Result<()> {
        self.ensure_open()?;
        ensure!(self.writable, io::Error::new(ErrorKind::InvalidInput, "write phase not started"));
        Ok(())
    }

    /// One refill of the read buffer; records the sticky EOF flag.
    async fn fill(&mut self) -> io::Result<usize> {
        self.read_buffer.reserve(READ_BUFFER_SIZE);
        let n = self.io.read_buf(&mut self.read_buffer).await?;
        if n == 0 {
            self.seen_eof = true;
        }
        Ok(n)
    }
}

impl<S> Connection for DirectConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn is_open(&self) -> bool {
        self.open
    }

    fn is_writable(&self) -> bool {
        self.open && self.writable
    }

    fn is_readable(&self) -> bool {
        self.open && self.readable
    }

    async fn start_write(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        self.writable = true;
        Ok(())
    }

    async fn close_write(&mut self) -> io::Result<()> {
        if self.is_writable() {
            self.io.flush().await?;
        }
        self.writable = false;
        Ok(())
    }

    async fn start_read(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        self.readable = true;
        Ok(())
    }

    async fn close_read(&mut self) -> io::Result<()> {
        self.readable = false;
        Ok(())
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_writable()?;
        self.io.write_all(buf).await?;
        Ok(buf.len())
    }

    async fn read(&mut self, max_len: usize) -> io::Result<Bytes> {
        self.ensure_readable()?;
        if max_len == 0 {
            return Ok(Bytes::new());
        }
        if self.read_buffer.is_empty() && !self.seen_eof {
            self.fill().await?;
        }
        let len = usize::min(max_len, self.read_buffer.len());
        Ok(self.read_buffer.split_to(len).freeze())
    }

    async fn read_exact(&mut self, len: usize) -> io::Result<Bytes> {
        self.ensure_readable()?;
        while self.read_buffer.len() < len && !self.seen_eof {
            self.fill().await?;
        }
        ensure!(
            self.read_buffer.len() >= len,
            io::Error::new(ErrorKind::UnexpectedEof, "transport ended inside an exact read")
        );
        Ok(self.read_buffer.split_to(len).freeze())
    }

    async fn read_line(&mut self) -> io::Result<Bytes> {
        self.ensure_readable()?;
        loop {
            if let Some(pos) = self.read_buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.read_buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                return Ok(line.freeze());
            }

            ensure!(
                self.read_buffer.len() <= MAX_LINE_BYTES,
                io::Error::new(ErrorKind::InvalidData, "protocol line too long")
            );
            ensure!(
                !self.seen_eof,
                io::Error::new(ErrorKind::UnexpectedEof, "transport ended inside a protocol line")
            );
            self.fill().await?;
        }
    }

    async fn eof(&mut self) -> io::Result<bool> {
        if !self.read_buffer.is_empty() {
            return Ok(false);
        }
        if self.seen_eof || !self.open {
            return Ok(true);
        }
        Ok(self.fill().await? == 0)
    }

    async fn force_close(&mut self) -> io::Result<()> {
        if self.open {
            trace!("force closing transport");
            // a transport that refuses shutdown is torn down regardless
            let _ = self.io.shutdown().await;
        }
        self.open = false;
        self.writable = false;
        self.readable = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    async fn readable_conn(input: &[u8]) -> DirectConnection<tokio::io::DuplexStream> {
        let (near, mut far) = duplex(64 * 1024);
        far.write_all(input).await.unwrap();
        drop(far);
        let mut conn = DirectConnection::new(near);
        conn.start_read().await.unwrap();
        conn
    }

    #[tokio::test]
    async fn read_respects_max_len() {
        let mut conn = readable_conn(b"abcdef").await;

        let bytes = conn.read(4).await.unwrap();
        assert_eq!(&bytes[..], b"abcd");

        let bytes = conn.read(100).await.unwrap();
        assert_eq!(&bytes[..], b"ef");

        assert!(conn.eof().await.unwrap());
        assert!(conn.read(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_line_strips_terminators() {
        let mut conn = readable_conn(b"first\r\nsecond\nthird\r\n").await;

        assert_eq!(&conn.read_line().await.unwrap()[..], b"first");
        assert_eq!(&conn.read_line().await.unwrap()[..], b"second");
        assert_eq!(&conn.read_line().await.unwrap()[..], b"third");
    }

    #[tokio::test]
    async fn read_line_fails_at_eof() {
        let mut conn = readable_conn(b"no terminator").await;

        let err = conn.read_line().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn read_exact_fails_short() {
        let mut conn = readable_conn(b"1234").await;

        let err = conn.read_exact(10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn phases_are_enforced() {
        let (near, _far) = duplex(1024);
        let mut conn = DirectConnection::new(near);

        let err = conn.read(10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = conn.write(b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        conn.start_write().await.unwrap();
        assert_eq!(conn.write(b"x").await.unwrap(), 1);
        conn.close_write().await.unwrap();
        assert!(!conn.is_writable());
    }

    #[tokio::test]
    async fn force_close_clears_phases() {
        let (near, _far) = duplex(1024);
        let mut conn = DirectConnection::new(near);
        conn.start_read().await.unwrap();
        conn.start_write().await.unwrap();

        conn.force_close().await.unwrap();
        conn.force_close().await.unwrap();

        assert!(!conn.is_open());
        assert!(!conn.is_readable());
        assert!(!conn.is_writable());

        let err = conn.start_read().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }
}
