//! Transport collaborator: the [`Connection`] trait and the shipped
//! [`DirectConnection`] implementation.
//!
//! The exchange stream consumes only this interface. Pooling, pipelined
//! serialization across exchanges and transport timeouts belong to whatever
//! implements or wraps it.

#[allow(clippy::module_inception, reason = "trait module mirrors the layout of the sibling modules")]
mod connection;
pub use connection::Connection;
pub use connection::LocalConnection;

mod direct;
pub use direct::DirectConnection;
