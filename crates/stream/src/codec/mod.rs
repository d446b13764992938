//! Wire codec for message heads and chunk framing.
//!
//! Two line-oriented codecs sit under the exchange stream:
//!
//! - [`head`]: parses a request or response head from the connection with
//!   `httparse` and serializes a head back to wire form.
//! - [`chunk`]: chunk-size line parsing, the chunk envelope, and the trailer
//!   section skip for chunked transfer encoding (RFC 9112 §7.1).

pub mod chunk;
pub mod head;

use bytes::{BufMut, BytesMut};
use std::io;

/// `io::Write` adapter over `BytesMut`, for `write!`-style serialization
/// into an already reserved buffer.
pub(crate) struct FastWrite<'a>(pub(crate) &'a mut BytesMut);

impl io::Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
