//! Core protocol abstractions for the exchange stream.
//!
//! # Architecture
//!
//! - **Message heads** ([`message`]): the [`Message`] enum over request and
//!   response heads, plus the header rules (chunked detection, declared body
//!   size, connection-token matching) the lifecycle depends on.
//!
//! - **Body bookkeeping** ([`body`]): [`BodySize`] for the framing a head
//!   declares, [`Remaining`] for the read cursor over the body.
//!
//! - **Error handling** ([`error`]): [`StreamError`] for the stream's own
//!   failure surface, [`ParseError`] for delegated protocol violations.

mod message;
pub use message::Message;
pub(crate) use message::Head;

mod body;
pub use body::BodySize;
pub use body::Remaining;

mod error;
pub use error::ParseError;
pub use error::StreamError;
