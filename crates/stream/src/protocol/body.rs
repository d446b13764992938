//! Body size bookkeeping for the exchange stream.
//!
//! Two small sum types carry all body-length state:
//!
//! - [`BodySize`]: the framing a message head declares, determined once when
//!   the head is parsed or serialized.
//! - [`Remaining`]: the read cursor over the current body (or current chunk),
//!   updated after every read. An unresolved chunk size is an explicit
//!   [`Remaining::Unknown`] variant rather than a negative sentinel, so an
//!   underflowed remainder is unrepresentable.

/// The body framing declared by a message head.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodySize {
    /// Body with an explicit `Content-Length` in bytes.
    Length(u64),
    /// Body using chunked transfer encoding.
    Chunked,
    /// No body at all.
    Empty,
}

impl BodySize {
    /// Returns true if the body uses chunked transfer encoding.
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, BodySize::Chunked)
    }

    /// Returns true if the message has no body.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, BodySize::Empty)
    }
}

/// Bytes remaining to be read for the current message body.
///
/// For a content-length body this counts down from the declared length to
/// zero. For a chunked body it counts down within the current chunk and
/// resets to [`Remaining::Unknown`] at each chunk boundary until the next
/// chunk-size line has been parsed; the zero-size chunk resolves it to
/// `Known(0)` for good.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Remaining {
    /// Exact number of body bytes still unread; zero means fully consumed.
    Known(u64),
    /// Chunked body whose next chunk-size line has not been parsed yet.
    Unknown,
}

impl Remaining {
    /// The known remainder, if resolved.
    #[inline]
    pub fn known(&self) -> Option<u64> {
        match self {
            Remaining::Known(n) => Some(*n),
            Remaining::Unknown => None,
        }
    }

    /// Returns true once the body (or current chunk) is fully consumed.
    #[inline]
    pub fn is_consumed(&self) -> bool {
        matches!(self, Remaining::Known(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_predicates() {
        assert_eq!(Remaining::Known(5).known(), Some(5));
        assert_eq!(Remaining::Unknown.known(), None);
        assert!(Remaining::Known(0).is_consumed());
        assert!(!Remaining::Known(1).is_consumed());
        assert!(!Remaining::Unknown.is_consumed());
    }
}
