//! A bidirectional HTTP/1.x byte-stream core
//!
//! This crate implements the body-streaming layer of an HTTP/1.1 exchange:
//! framing (content-length and chunked transfer encoding), a cursor over the
//! inbound body, and the lifecycle of one request/response exchange over a
//! borrowed connection. It contains no connection establishment, no TLS, no
//! retry or redirect policy and no pooling; those belong to the transport
//! collaborator behind the [`connection::Connection`] trait.
//!
//! # Features
//!
//! - Chunked and content-length body framing, selected automatically per
//!   message
//! - Exact remaining-byte tracking across arbitrary read sizes
//! - `Expect: 100-continue` handshake on both the client and the server side
//! - Keep-alive versus forced-close policy, including the HTTP/1.0 default
//! - Truncated bodies surface as definite errors and poison the connection
//!
//! # Example
//!
//! ```no_run
//! use http::{Method, Request, Version};
//! use h1_stream::connection::DirectConnection;
//! use h1_stream::protocol::Message;
//! use h1_stream::stream::ExchangeStream;
//! use tokio::net::TcpStream;
//! use tracing::{info, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)?;
//!
//!     let tcp_stream = TcpStream::connect("127.0.0.1:8080").await?;
//!     let mut connection = DirectConnection::new(tcp_stream);
//!
//!     let head = Request::builder()
//!         .method(Method::POST)
//!         .uri("/upload")
//!         .version(Version::HTTP_11)
//!         .header("Host", "127.0.0.1")
//!         .body(())?;
//!
//!     let mut request = ExchangeStream::new(Message::outbound_request(head), &mut connection);
//!     request.write(b"hello, world").await?;
//!     request.close_write().await?;
//!     drop(request);
//!
//!     let mut response = ExchangeStream::new(Message::inbound_response(), &mut connection);
//!     let mut body = Vec::new();
//!     while !response.eof().await? {
//!         body.extend_from_slice(&response.read_bytes(4 * 1024).await?);
//!     }
//!     let message = response.close_read().await?;
//!     info!(status = ?message.status(), bytes = body.len(), "exchange finished");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`stream`]: the [`stream::ExchangeStream`] driving one exchange
//! - [`protocol`]: message heads, body bookkeeping and error types
//! - [`codec`]: head parsing/serialization and chunk framing
//! - [`connection`]: the transport trait and a buffered implementation
//!
//! # Limitations
//!
//! - HTTP/1.x only; serializing an HTTP/2 or HTTP/3 head is an error
//! - Trailer fields after a chunked body are consumed and discarded
//! - Maximum header block size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod protocol;
pub mod stream;

mod utils;
pub(crate) use utils::ensure;
