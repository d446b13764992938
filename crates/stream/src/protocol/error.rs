use std::io;
use thiserror::Error;

/// Errors surfaced by an exchange stream.
///
/// The stream's only own failure class is [`StreamError::TruncatedBody`];
/// protocol violations detected while parsing heads or chunk frames are
/// delegated to [`ParseError`] and surfaced unchanged, and transport failures
/// propagate as [`StreamError::Io`]. No error is retried at this layer.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The body ended before its declared or chunk-delimited length was
    /// satisfied. The connection has been force-closed before this is
    /// returned: a transport that delivered a short body can never be
    /// trusted for reuse.
    #[error("truncated body: {remaining} bytes still expected")]
    TruncatedBody { remaining: u64 },

    #[error("unsupported http version: {0:?}")]
    UnsupportedVersion(http::Version),

    #[error("protocol error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StreamError {
    pub fn truncated(remaining: u64) -> Self {
        Self::TruncatedBody { remaining }
    }

    /// True when this error is the truncation failure.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedBody { .. })
    }
}

/// Protocol violations found while parsing a message head or chunk framing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid http status code")]
    InvalidStatus,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid chunk size line: {reason}")]
    InvalidChunkSize { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_chunk_size<S: ToString>(str: S) -> Self {
        Self::InvalidChunkSize { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
