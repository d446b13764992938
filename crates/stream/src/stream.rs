//! The exchange stream: framing, body cursor and lifecycle for one HTTP
//! exchange over a borrowed connection.
//!
//! An [`ExchangeStream`] binds one [`Message`] to one [`Connection`] for
//! exactly one request/response exchange. The caller drives the write side
//! (`write`, then `close_write`) and the read side (`read_bytes`/`eof`, then
//! `close_read`) in exchange order; every operation may suspend while bytes
//! move over the transport, and the stream holds no state beyond the one
//! exchange.
//!
//! The write side selects its framing once, at the first write or at an
//! explicit [`ExchangeStream::start_write`]. The read side keeps a cursor
//! over the inbound body and refuses to release the connection for reuse
//! while a definite positive remainder is unread: a short body is a
//! [`StreamError::TruncatedBody`], and the transport is force-closed before
//! that error is returned.

use bytes::{Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, EXPECT, TRANSFER_ENCODING, UPGRADE};
use http::{HeaderName, HeaderValue, StatusCode, Version};
use tracing::{debug, info, trace};

use crate::codec::{chunk, head};
use crate::connection::Connection;
use crate::protocol::{BodySize, Message, Remaining, StreamError};

/// Read granularity while draining an unread body at close.
const DRAIN_READ_BYTES: usize = 8 * 1024;

/// The interim head sent to a peer that asked for `Expect: 100-continue`.
const CONTINUE_HEAD: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// One HTTP exchange over a borrowed connection.
pub struct ExchangeStream<'c, C: Connection> {
    message: Message,
    connection: &'c mut C,
    head_sent: bool,
    head_received: bool,
    write_chunked: bool,
    read_chunked: bool,
    to_read: Remaining,
}

impl<C: Connection> std::fmt::Debug for ExchangeStream<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeStream")
            .field("message", &self.message)
            .field("write_chunked", &self.write_chunked)
            .field("read_chunked", &self.read_chunked)
            .field("to_read", &self.to_read)
            .finish_non_exhaustive()
    }
}

impl<'c, C: Connection> ExchangeStream<'c, C> {
    /// Binds `message` to `connection` for one exchange.
    ///
    /// An outbound message (see [`Message::outbound_request`] and
    /// [`Message::outbound_response`]) makes this the writing side; an
    /// inbound placeholder makes it the reading side.
    pub fn new(message: Message, connection: &'c mut C) -> Self {
        Self {
            message,
            connection,
            head_sent: false,
            head_received: false,
            write_chunked: false,
            read_chunked: false,
            to_read: Remaining::Unknown,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn header(&self, name: HeaderName) -> Option<&HeaderValue> {
        self.message.header(name)
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.message.set_header(name, value);
    }

    /// Sets the status code of an outbound response head. No effect on a
    /// request.
    pub fn set_status(&mut self, status: StatusCode) {
        self.message.set_status(status);
    }

    /// Opens the write phase, selects the outbound framing and sends the
    /// head. Implicit on the first [`write`](Self::write); must be called
    /// explicitly for a bodyless message so the head still goes out.
    pub async fn start_write(&mut self) -> Result<(), StreamError> {
        if self.head_sent {
            return Ok(());
        }
        if !self.connection.is_writable() {
            self.connection.start_write().await?;
        }

        if self.select_chunked_framing() {
            self.message.set_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            self.write_chunked = true;
        } else {
            self.write_chunked = self.message.is_chunked();
        }

        let mut buffer = BytesMut::with_capacity(256);
        head::write_head(&self.message, &mut buffer)?;
        self.connection.write(&buffer).await?;
        self.head_sent = true;
        trace!(bytes = buffer.len(), chunked = self.write_chunked, "head sent");
        Ok(())
    }

    /// Chunked framing is selected when the head declares no framing of its
    /// own and the message either is a request, or is a response on a
    /// protocol version that supports chunking with a body that is not known
    /// to be empty.
    fn select_chunked_framing(&self) -> bool {
        if self.message.has_header(CONTENT_LENGTH)
            || self.message.has_header(TRANSFER_ENCODING)
            || self.message.has_header(UPGRADE)
        {
            return false;
        }
        if self.message.is_request() {
            return true;
        }
        self.message.version() >= Version::HTTP_11 && self.message.body_hint().is_none_or(|length| length > 0)
    }

    /// Writes body bytes, returning the number of bytes put on the wire.
    ///
    /// An empty buffer is a no-op returning zero. When chunked framing is in
    /// effect the returned count includes the chunk envelope, not just the
    /// payload.
    pub async fn write(&mut self, payload: &[u8]) -> Result<usize, StreamError> {
        if payload.is_empty() {
            return Ok(0);
        }
        if !self.head_sent && self.connection.is_open() {
            self.start_write().await?;
        }

        if self.write_chunked {
            let mut buffer = BytesMut::with_capacity(payload.len() + 16);
            chunk::encode_chunk(payload, &mut buffer)?;
            self.connection.write(&buffer).await?;
            Ok(buffer.len())
        } else {
            Ok(self.connection.write(payload).await?)
        }
    }

    /// Terminates a chunked body with the zero-size chunk, exactly once.
    /// No-op for other framings.
    pub async fn close_body(&mut self) -> Result<(), StreamError> {
        if self.write_chunked {
            self.connection.write(chunk::CLOSING_CHUNK).await?;
            self.write_chunked = false;
        }
        Ok(())
    }

    /// Closes the write side of the exchange.
    ///
    /// For a request, the connection-reuse policy is applied afterwards:
    /// `Connection: close`, `Connection: upgrade`, or a pre-1.1 version
    /// without `Connection: keep-alive` force-closes the whole connection
    /// rather than just the write phase.
    pub async fn close_write(&mut self) -> Result<(), StreamError> {
        if self.connection.is_writable() {
            self.close_body().await?;
            self.connection.close_write().await?;
        }

        if self.message.is_request() && self.must_close_after_send() {
            debug!("request head demands close, dropping connection");
            self.connection.force_close().await?;
        }
        Ok(())
    }

    fn must_close_after_send(&self) -> bool {
        if self.message.header_has_token(CONNECTION, "close") || self.message.header_has_token(CONNECTION, "upgrade") {
            return true;
        }
        self.message.version() < Version::HTTP_11 && !self.message.header_has_token(CONNECTION, "keep-alive")
    }

    /// Opens the read phase, parses the peer's head into the message, runs
    /// the continue handshake and initializes the body cursor. Implicit on
    /// the first read operation.
    pub async fn start_read(&mut self) -> Result<(), StreamError> {
        if self.head_received {
            return Ok(());
        }
        if !self.connection.is_readable() {
            self.connection.start_read().await?;
        }

        head::read_head(self.connection, &mut self.message).await?;
        self.handle_continuation().await?;
        self.head_received = true;

        let body_size = self.message.body_size()?;
        self.read_chunked = body_size.is_chunked();
        self.to_read = match body_size {
            BodySize::Length(length) => Remaining::Known(length),
            BodySize::Chunked => Remaining::Unknown,
            BodySize::Empty => Remaining::Known(0),
        };
        debug!(?body_size, "head received");
        Ok(())
    }

    /// The `100-continue` handshake, run right after the head is parsed.
    ///
    /// Reading a request that declared `Expect: 100-continue` means this
    /// side is the server: send the interim head so the peer starts its
    /// body. Reading a response with status 100 means the head just parsed
    /// was interim: parse further heads until the real one arrives.
    async fn handle_continuation(&mut self) -> Result<(), StreamError> {
        if self.message.is_request() {
            if self.message.header_has_token(EXPECT, "100-continue") {
                if !self.connection.is_writable() {
                    self.connection.start_write().await?;
                }
                self.connection.write(CONTINUE_HEAD).await?;
                info!("sent interim 100 continue");
            }
            return Ok(());
        }

        while self.message.status() == Some(StatusCode::CONTINUE) {
            trace!("skipping interim 100 continue");
            head::read_head(self.connection, &mut self.message).await?;
        }
        Ok(())
    }

    /// The bytes remaining in the inbound body, resolving the next
    /// chunk-size line when the cursor is at a chunk boundary. Triggers
    /// [`start_read`](Self::start_read) if the head has not been parsed yet.
    pub async fn remaining_to_read(&mut self) -> Result<Remaining, StreamError> {
        if !self.head_received && self.connection.is_open() {
            self.start_read().await?;
        }
        self.resolve_remaining().await?;
        Ok(self.to_read)
    }

    async fn resolve_remaining(&mut self) -> Result<(), StreamError> {
        if self.read_chunked && self.to_read == Remaining::Unknown {
            let size = chunk::read_chunk_size(self.connection).await?;
            if size == 0 {
                chunk::skip_trailer_section(self.connection).await?;
                self.read_chunked = false;
                self.to_read = Remaining::Known(0);
            } else {
                self.to_read = Remaining::Known(size);
            }
            trace!(chunk = size, "chunk size resolved");
        }
        Ok(())
    }

    /// The CRLF after each chunk's data; read and discarded, never delivered.
    fn trailing_bytes(&self) -> u64 {
        if self.read_chunked { 2 } else { 0 }
    }

    /// Reads up to `max_len` body bytes. An empty result means the body is
    /// fully consumed.
    pub async fn read_bytes(&mut self, max_len: usize) -> Result<Bytes, StreamError> {
        let Some(remaining) = self.remaining_to_read().await?.known() else {
            return Ok(Bytes::new());
        };
        if remaining == 0 {
            return Ok(Bytes::new());
        }

        let to_fetch = max_len.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let fetch_cap = usize::try_from(remaining.saturating_add(self.trailing_bytes())).unwrap_or(usize::MAX);
        let with_trailer = max_len.min(fetch_cap);

        let mut bytes = self.connection.read(with_trailer).await?;
        let delivered = bytes.len().min(to_fetch);
        bytes.truncate(delivered);

        let updated = remaining.checked_sub(delivered as u64);
        debug_assert!(updated.is_some(), "body cursor underflow");
        self.to_read = Remaining::Known(updated.unwrap_or(0));
        if self.read_chunked && self.to_read.is_consumed() {
            self.to_read = Remaining::Unknown;
        }
        Ok(bytes)
    }

    /// True once no body byte will be delivered anymore. At a chunk boundary
    /// this resolves the next chunk-size line, so the answer is definite
    /// right after the last data byte of a chunked body.
    pub async fn eof(&mut self) -> Result<bool, StreamError> {
        if self.remaining_to_read().await?.is_consumed() {
            return Ok(true);
        }
        Ok(self.connection.eof().await?)
    }

    /// Reads exactly `len` body bytes, failing with a truncation error (and
    /// force-closing the connection) when the body ends first.
    pub async fn read_exact(&mut self, len: usize) -> Result<Bytes, StreamError> {
        let mut collected = BytesMut::with_capacity(len);
        while collected.len() < len {
            let bytes = self.read_bytes(len - collected.len()).await?;
            if bytes.is_empty() {
                let missing = (len - collected.len()) as u64;
                self.connection.force_close().await?;
                return Err(StreamError::truncated(missing));
            }
            collected.extend_from_slice(&bytes);
        }
        Ok(collected.freeze())
    }

    /// True when the peer has already rejected the exchange: the write phase
    /// is still open, yet the response head carries an error status together
    /// with `Connection: close`. The sender should stop transmitting the
    /// request body rather than waste bandwidth (RFC 7230 §6.5).
    pub fn is_aborted(&self) -> bool {
        self.message.is_response()
            && self.connection.is_writable()
            && self.message.is_error_status()
            && self.message.header_has_token(CONNECTION, "close")
    }

    /// Closes the read side, returning the completed message.
    ///
    /// For a response this drains any unread body first; a definite positive
    /// remainder still unread is a truncation, which force-closes the
    /// connection, as does a response carrying `Connection: close`.
    /// Otherwise only the read phase is released, permitting reuse.
    pub async fn close_read(mut self) -> Result<Message, StreamError> {
        if self.message.is_response() {
            self.drain_body().await?;
        }

        if let Some(remaining) = self.to_read.known()
            && remaining > 0
        {
            self.connection.force_close().await?;
            return Err(StreamError::truncated(remaining));
        }

        if self.message.is_response() && self.message.header_has_token(CONNECTION, "close") {
            debug!("response head demands close, dropping connection");
            self.connection.force_close().await?;
        } else if self.connection.is_readable() {
            self.connection.close_read().await?;
        }
        Ok(self.message)
    }

    async fn drain_body(&mut self) -> Result<(), StreamError> {
        while !self.eof().await? {
            let discarded = self.read_bytes(DRAIN_READ_BYTES).await?;
            if discarded.is_empty() {
                break;
            }
            trace!(bytes = discarded.len(), "drained unread body");
        }
        Ok(())
    }
}
