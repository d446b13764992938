//! The transport collaborator interface.
//!
//! An exchange stream never owns its transport; it drives a borrowed
//! [`Connection`] through well-defined phase transitions. The trait carries
//! both the phase lifecycle (so a pooled transport can serialize pipelined
//! exchanges: `start_read` for exchange N+1 may block until exchange N's
//! `close_read` released the phase) and the raw byte primitives the framing
//! layer needs.

use bytes::Bytes;
use std::io;

/// Lifecycle and raw I/O primitives of an underlying transport.
///
/// `Connection` is the `Send` variant for multithreaded runtimes;
/// [`LocalConnection`] is the single-threaded original.
///
/// Every async method may suspend the calling task while bytes move over the
/// transport. Phase inspectors are synchronous: they report bookkeeping, not
/// transport readiness.
#[trait_variant::make(Connection: Send)]
pub trait LocalConnection {
    /// True while the transport has not been force-closed (or closed by the
    /// implementation for its own reasons).
    fn is_open(&self) -> bool;

    /// True while a write phase is open.
    fn is_writable(&self) -> bool;

    /// True while a read phase is open.
    fn is_readable(&self) -> bool;

    /// Opens the write phase. Must be called before any byte is written.
    async fn start_write(&mut self) -> io::Result<()>;

    /// Closes the write phase, flushing buffered output.
    async fn close_write(&mut self) -> io::Result<()>;

    /// Opens the read phase.
    async fn start_read(&mut self) -> io::Result<()>;

    /// Closes the read phase, releasing it for a following exchange.
    async fn close_read(&mut self) -> io::Result<()>;

    /// Writes the whole buffer, returning the number of bytes written.
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reads up to `max_len` bytes. An empty result means end-of-data.
    async fn read(&mut self, max_len: usize) -> io::Result<Bytes>;

    /// Reads exactly `len` bytes, failing with `UnexpectedEof` when the
    /// transport ends first.
    async fn read_exact(&mut self, len: usize) -> io::Result<Bytes>;

    /// Reads one line, consuming and stripping the terminator. CRLF is the
    /// wire form; a lone LF is tolerated.
    async fn read_line(&mut self) -> io::Result<Bytes>;

    /// True when no more data will arrive. May probe the transport when
    /// nothing is buffered.
    async fn eof(&mut self) -> io::Result<bool>;

    /// Tears the transport down entirely. Idempotent; after this call
    /// `is_open` reports false and every phase is closed.
    async fn force_close(&mut self) -> io::Result<()>;
}
