//! Chunk framing for chunked transfer encoding.
//!
//! Wire form of one chunk: the size in lowercase hex, CRLF, the data, CRLF.
//! The body ends with the zero-size chunk, an optional trailer section, and
//! one final empty line.

use std::io::Write;

use bytes::BytesMut;
use tracing::trace;

use crate::codec::FastWrite;
use crate::connection::Connection;
use crate::ensure;
use crate::protocol::ParseError;

/// The terminating zero-size chunk with its empty trailer section.
pub const CLOSING_CHUNK: &[u8] = b"0\r\n\r\n";

/// Serializes one chunk envelope (size line, data, data terminator).
pub fn encode_chunk(payload: &[u8], dst: &mut BytesMut) -> std::io::Result<()> {
    dst.reserve(payload.len() + 16);
    write!(FastWrite(dst), "{:x}\r\n", payload.len())?;
    dst.extend_from_slice(payload);
    dst.extend_from_slice(b"\r\n");
    Ok(())
}

/// Parses a chunk-size line: hex digits, optionally followed by chunk
/// extensions which are ignored.
pub fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let mut size: u64 = 0;
    let mut digits = 0_usize;

    for &byte in line {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b';' | b' ' | b'\t' => break,
            _ => return Err(ParseError::invalid_chunk_size(format!("unexpected byte {byte:#04x}"))),
        };

        size = size
            .checked_mul(16)
            .and_then(|s| s.checked_add(u64::from(digit)))
            .ok_or_else(|| ParseError::invalid_chunk_size("chunk size overflows u64"))?;
        digits += 1;
    }

    ensure!(digits > 0, ParseError::invalid_chunk_size("no hex digits in size line"));
    Ok(size)
}

/// Reads and parses the next chunk-size line from the connection.
///
/// Tolerates one leading empty line: the data terminator of the previous
/// chunk, when a length-limited read stopped at the chunk's last data byte.
pub async fn read_chunk_size<C: Connection>(connection: &mut C) -> Result<u64, ParseError> {
    let mut line = connection.read_line().await?;
    if line.is_empty() {
        line = connection.read_line().await?;
    }
    parse_chunk_size(&line)
}

/// Consumes the trailer section after the zero-size chunk, up to and
/// including the final empty line. Trailer fields are discarded.
pub async fn skip_trailer_section<C: Connection>(connection: &mut C) -> Result<(), ParseError> {
    loop {
        let line = connection.read_line().await?;
        if line.is_empty() {
            return Ok(());
        }
        trace!(len = line.len(), "discarded trailer field");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_parsing() {
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b"5").unwrap(), 5);
        assert_eq!(parse_chunk_size(b"12c").unwrap(), 300);
        assert_eq!(parse_chunk_size(b"FF").unwrap(), 255);
        assert_eq!(parse_chunk_size(b"ffffffffffffffff").unwrap(), u64::MAX);
    }

    #[test]
    fn chunk_size_extensions_are_ignored() {
        assert_eq!(parse_chunk_size(b"1a;name=value").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"1a ;name").unwrap(), 26);
    }

    #[test]
    fn invalid_chunk_sizes_are_rejected() {
        assert!(parse_chunk_size(b"").is_err());
        assert!(parse_chunk_size(b";ext").is_err());
        assert!(parse_chunk_size(b"xyz").is_err());
        assert!(parse_chunk_size(b"1ffffffffffffffff").is_err());
    }

    #[test]
    fn chunk_encoding() {
        let mut dst = BytesMut::new();
        encode_chunk(b"hello", &mut dst).unwrap();
        assert_eq!(&dst[..], b"5\r\nhello\r\n");

        let mut dst = BytesMut::new();
        encode_chunk(&[b'x'; 300], &mut dst).unwrap();
        assert!(dst.starts_with(b"12c\r\n"));
        assert!(dst.ends_with(b"\r\n"));
        assert_eq!(dst.len(), 5 + 300 + 2);
    }
}
