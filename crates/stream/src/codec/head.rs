//! Message head parsing and serialization.
//!
//! Inbound heads are read line by line off the connection into one block and
//! handed to `httparse`; outbound heads are serialized straight into a
//! `BytesMut` so one `write` pushes the whole head to the transport.

use std::io::Write;

use bytes::BytesMut;
use http::{Method, Request, Response, StatusCode, Uri, Version};
use tracing::trace;

use crate::codec::FastWrite;
use crate::connection::Connection;
use crate::ensure;
use crate::protocol::{Head, Message, ParseError, StreamError};

const MAX_HEADER_NUM: usize = 64;
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Reads the peer's message head and parses it into `message`, replacing the
/// placeholder head. The message's variant decides whether a request line or
/// a status line is expected.
pub async fn read_head<C: Connection>(connection: &mut C, message: &mut Message) -> Result<(), ParseError> {
    let block = read_head_block(connection).await?;
    trace!(bytes = block.len(), "head block read");

    if message.is_request() {
        message.replace_request(parse_request_head(&block)?);
    } else {
        message.replace_response(parse_response_head(&block)?);
    }
    Ok(())
}

/// Accumulates head lines up to and including the empty terminator line.
/// Empty lines before the start line are tolerated per RFC 9112 §2.2.
async fn read_head_block<C: Connection>(connection: &mut C) -> Result<BytesMut, ParseError> {
    let mut block = BytesMut::with_capacity(1024);
    loop {
        let line = connection.read_line().await?;
        if line.is_empty() {
            if block.is_empty() {
                continue;
            }
            block.extend_from_slice(b"\r\n");
            return Ok(block);
        }

        block.extend_from_slice(&line);
        block.extend_from_slice(b"\r\n");
        ensure!(
            block.len() <= MAX_HEADER_BYTES,
            ParseError::too_large_header(block.len(), MAX_HEADER_BYTES)
        );
    }
}

fn parse_request_head(buf: &[u8]) -> Result<Request<()>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut parsed = httparse::Request::new(&mut headers);
    complete(parsed.parse(buf))?;

    let method = parsed.method.ok_or(ParseError::InvalidMethod)?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;

    let uri = parsed.path.ok_or(ParseError::InvalidUri)?;
    let uri = uri.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

    let mut builder = Request::builder().method(method).uri(uri).version(map_version(parsed.version)?);
    for header in parsed.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    builder.body(()).map_err(ParseError::invalid_header)
}

fn parse_response_head(buf: &[u8]) -> Result<Response<()>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut parsed = httparse::Response::new(&mut headers);
    complete(parsed.parse(buf))?;

    let code = parsed.code.ok_or(ParseError::InvalidStatus)?;
    let status = StatusCode::from_u16(code).map_err(|_| ParseError::InvalidStatus)?;

    let mut builder = Response::builder().status(status).version(map_version(parsed.version)?);
    for header in parsed.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    builder.body(()).map_err(ParseError::invalid_header)
}

fn complete(result: Result<httparse::Status<usize>, httparse::Error>) -> Result<(), ParseError> {
    match result {
        Ok(httparse::Status::Complete(_)) => Ok(()),
        Ok(httparse::Status::Partial) => Err(ParseError::invalid_header("incomplete head block")),
        Err(httparse::Error::TooManyHeaders) => Err(ParseError::too_many_headers(MAX_HEADER_NUM)),
        Err(e) => Err(ParseError::invalid_header(e)),
    }
}

fn map_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        other => Err(ParseError::InvalidVersion(other)),
    }
}

/// Serializes a message head (start line, headers, terminating empty line)
/// into `dst`.
pub fn write_head(message: &Message, dst: &mut BytesMut) -> Result<(), StreamError> {
    dst.reserve(256);

    match message.head() {
        Head::Request(request) => {
            write!(
                FastWrite(dst),
                "{} {} {}\r\n",
                request.method(),
                request.uri(),
                version_str(request.version())?
            )
            .map_err(StreamError::from)?;
        }
        Head::Response(response) => {
            let status = response.status();
            write!(
                FastWrite(dst),
                "{} {} {}\r\n",
                version_str(response.version())?,
                status.as_str(),
                status.canonical_reason().unwrap_or("Unknown")
            )
            .map_err(StreamError::from)?;
        }
    }

    for (name, value) in message.headers() {
        dst.extend_from_slice(name.as_str().as_bytes());
        dst.extend_from_slice(b": ");
        dst.extend_from_slice(value.as_bytes());
        dst.extend_from_slice(b"\r\n");
    }
    dst.extend_from_slice(b"\r\n");
    Ok(())
}

fn version_str(version: Version) -> Result<&'static str, StreamError> {
    match version {
        Version::HTTP_10 => Ok("HTTP/1.0"),
        Version::HTTP_11 => Ok("HTTP/1.1"),
        other => Err(StreamError::UnsupportedVersion(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DirectConnection;
    use http::header::{CONTENT_LENGTH, HOST};
    use tokio::io::{duplex, AsyncWriteExt};

    async fn readable_conn(input: &[u8]) -> DirectConnection<tokio::io::DuplexStream> {
        let (near, mut far) = duplex(64 * 1024);
        far.write_all(input).await.unwrap();
        drop(far);
        let mut conn = DirectConnection::new(near);
        conn.start_read().await.unwrap();
        conn
    }

    #[tokio::test]
    async fn parses_request_head() {
        let mut conn = readable_conn(b"GET /ping HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello").await;
        let mut message = Message::inbound_request();

        read_head(&mut conn, &mut message).await.unwrap();

        let request = message.as_request().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/ping");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(message.header(HOST).unwrap(), "example.com");
        assert_eq!(message.header(CONTENT_LENGTH).unwrap(), "5");

        // body bytes stay on the connection
        assert_eq!(&conn.read_exact(5).await.unwrap()[..], b"hello");
    }

    #[tokio::test]
    async fn parses_response_head() {
        let mut conn = readable_conn(b"HTTP/1.0 404 Not Found\r\nContent-Length: 0\r\n\r\n").await;
        let mut message = Message::inbound_response();

        read_head(&mut conn, &mut message).await.unwrap();

        let response = message.as_response().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.version(), Version::HTTP_10);
    }

    #[tokio::test]
    async fn tolerates_leading_empty_lines() {
        let mut conn = readable_conn(b"\r\n\r\nHTTP/1.1 200 OK\r\n\r\n").await;
        let mut message = Message::inbound_response();

        read_head(&mut conn, &mut message).await.unwrap();
        assert_eq!(message.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn rejects_unknown_version() {
        let mut conn = readable_conn(b"GET / HTTP/2.0\r\n\r\n").await;
        let mut message = Message::inbound_request();

        let err = read_head(&mut conn, &mut message).await.unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. } | ParseError::InvalidVersion(_)));
    }

    #[test]
    fn writes_request_head() {
        let head = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .version(Version::HTTP_11)
            .header("Host", "example.com")
            .header("Transfer-Encoding", "chunked")
            .body(())
            .unwrap();
        let message = Message::outbound_request(head);

        let mut dst = BytesMut::new();
        write_head(&message, &mut dst).unwrap();

        assert_eq!(
            &dst[..],
            b"POST /upload HTTP/1.1\r\nhost: example.com\r\ntransfer-encoding: chunked\r\n\r\n" as &[u8]
        );
    }

    #[test]
    fn writes_response_head() {
        let head = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .version(Version::HTTP_11)
            .body(())
            .unwrap();
        let message = Message::outbound_response(head);

        let mut dst = BytesMut::new();
        write_head(&message, &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 204 No Content\r\n\r\n" as &[u8]);
    }

    #[test]
    fn rejects_http2_on_write() {
        let head = Response::builder().version(Version::HTTP_2).body(()).unwrap();
        let message = Message::outbound_response(head);

        let mut dst = BytesMut::new();
        let err = write_head(&message, &mut dst).unwrap_err();
        assert!(matches!(err, StreamError::UnsupportedVersion(_)));
    }
}
