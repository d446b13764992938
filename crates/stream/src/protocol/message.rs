//! The per-exchange HTTP message head.
//!
//! A [`Message`] binds one exchange stream to the head it writes or the head
//! it parses: an outbound request and an inbound response on the client side,
//! or the mirrored pair on the server side. The variant decides which
//! side-dependent lifecycle rules apply (close policies, the continue
//! handshake, abort detection); the header-inspection rules live here so the
//! stream itself only deals in framing and phases.
//!
//! The head types are the standard `http` crate `Request<()>`/`Response<()>`
//! with the body slot left empty: bodies never pass through a head, they are
//! streamed through the exchange stream directly.

use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version};

use crate::protocol::{BodySize, ParseError};

/// A message head bound to one HTTP exchange.
///
/// Carries an optional body hint: the computed length of the body the caller
/// intends to write, used only when selecting outbound framing for a
/// response (a response that is known to be empty must not be chunked).
#[derive(Debug)]
pub struct Message {
    head: Head,
    body_hint: Option<u64>,
}

/// The direction-deciding head variant.
#[derive(Debug)]
pub(crate) enum Head {
    Request(Request<()>),
    Response(Response<()>),
}

impl Message {
    /// A request head this side is going to send.
    pub fn outbound_request(head: Request<()>) -> Self {
        Self { head: Head::Request(head), body_hint: None }
    }

    /// A response head this side is going to send.
    pub fn outbound_response(head: Response<()>) -> Self {
        Self { head: Head::Response(head), body_hint: None }
    }

    /// A placeholder request head, to be filled by parsing the peer's request.
    pub fn inbound_request() -> Self {
        Self { head: Head::Request(Request::new(())), body_hint: None }
    }

    /// A placeholder response head, to be filled by parsing the peer's response.
    pub fn inbound_response() -> Self {
        Self { head: Head::Response(Response::new(())), body_hint: None }
    }

    /// Sets the computed outbound body length, when the caller knows it.
    pub fn with_body_hint(mut self, length: u64) -> Self {
        self.body_hint = Some(length);
        self
    }

    pub fn body_hint(&self) -> Option<u64> {
        self.body_hint
    }

    #[inline]
    pub fn is_request(&self) -> bool {
        matches!(self.head, Head::Request(_))
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        matches!(self.head, Head::Response(_))
    }

    pub(crate) fn head(&self) -> &Head {
        &self.head
    }

    pub(crate) fn replace_request(&mut self, head: Request<()>) {
        self.head = Head::Request(head);
    }

    pub(crate) fn replace_response(&mut self, head: Response<()>) {
        self.head = Head::Response(head);
    }

    /// The request head, when this message is a request.
    pub fn as_request(&self) -> Option<&Request<()>> {
        match &self.head {
            Head::Request(request) => Some(request),
            Head::Response(_) => None,
        }
    }

    /// The response head, when this message is a response.
    pub fn as_response(&self) -> Option<&Response<()>> {
        match &self.head {
            Head::Request(_) => None,
            Head::Response(response) => Some(response),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match &self.head {
            Head::Request(request) => request.headers(),
            Head::Response(response) => response.headers(),
        }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        match &mut self.head {
            Head::Request(request) => request.headers_mut(),
            Head::Response(response) => response.headers_mut(),
        }
    }

    pub fn version(&self) -> Version {
        match &self.head {
            Head::Request(request) => request.version(),
            Head::Response(response) => response.version(),
        }
    }

    /// The status code, for response messages.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.head {
            Head::Request(_) => None,
            Head::Response(response) => Some(response.status()),
        }
    }

    /// Sets the status code. Has no effect on request messages.
    pub fn set_status(&mut self, status: StatusCode) {
        if let Head::Response(response) = &mut self.head {
            *response.status_mut() = status;
        }
    }

    pub fn header(&self, name: HeaderName) -> Option<&HeaderValue> {
        self.headers().get(name)
    }

    pub fn has_header(&self, name: HeaderName) -> bool {
        self.headers().contains_key(name)
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }

    /// True when any value of `name` contains `token` in its comma-separated
    /// list, compared case-insensitively.
    ///
    /// This is the matching rule for connection-option headers such as
    /// `Connection: keep-alive, upgrade` and for `Expect: 100-continue`.
    pub fn header_has_token(&self, name: HeaderName, token: &str) -> bool {
        self.headers().get_all(name).iter().any(|value| {
            value
                .to_str()
                .is_ok_and(|list| list.split(',').any(|item| item.trim().eq_ignore_ascii_case(token)))
        })
    }

    /// True when the head declares chunked transfer encoding.
    ///
    /// Per RFC 9112, chunked must be the final encoding when present.
    pub fn is_chunked(&self) -> bool {
        te_is_chunked(self.headers().get(TRANSFER_ENCODING))
    }

    /// The body framing this head declares.
    ///
    /// # Errors
    ///
    /// Declaring both `Content-Length` and `Transfer-Encoding`, or an
    /// unparseable `Content-Length`, is a protocol error.
    pub fn body_size(&self) -> Result<BodySize, ParseError> {
        let te_header = self.headers().get(TRANSFER_ENCODING);
        let cl_header = self.headers().get(CONTENT_LENGTH);

        match (te_header, cl_header) {
            (None, None) => Ok(BodySize::Empty),

            (te_value @ Some(_), None) => {
                if te_is_chunked(te_value) {
                    Ok(BodySize::Chunked)
                } else {
                    Ok(BodySize::Empty)
                }
            }

            (None, Some(cl_value)) => {
                let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

                let length = cl_str
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

                Ok(BodySize::Length(length))
            }

            (Some(_), Some(_)) => {
                Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
            }
        }
    }

    /// True when this is a response with a 4xx or 5xx status.
    pub fn is_error_status(&self) -> bool {
        matches!(self.status(), Some(status) if status.is_client_error() || status.is_server_error())
    }
}

/// Checks if a `Transfer-Encoding` value ends with the chunked coding.
fn te_is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii() == CHUNKED;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONNECTION, EXPECT};

    #[test]
    fn check_te_is_chunked() {
        {
            let headers = HeaderMap::new();
            assert!(!te_is_chunked(headers.get(TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip, chunked".parse().unwrap());
            assert!(te_is_chunked(headers.get(TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "chunked, gzip".parse().unwrap());
            assert!(!te_is_chunked(headers.get(TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip".parse().unwrap());
            assert!(!te_is_chunked(headers.get(TRANSFER_ENCODING)));
        }
    }

    #[test]
    fn header_token_matching() {
        let head = Request::builder()
            .header("Connection", "Keep-Alive, Upgrade")
            .header("Expect", "100-continue")
            .body(())
            .unwrap();
        let message = Message::outbound_request(head);

        assert!(message.header_has_token(CONNECTION, "keep-alive"));
        assert!(message.header_has_token(CONNECTION, "upgrade"));
        assert!(!message.header_has_token(CONNECTION, "close"));
        assert!(message.header_has_token(EXPECT, "100-continue"));
    }

    #[test]
    fn body_size_from_headers() {
        let head = Request::builder().header("Content-Length", "42").body(()).unwrap();
        assert_eq!(Message::outbound_request(head).body_size().unwrap(), BodySize::Length(42));

        let head = Request::builder().header("Transfer-Encoding", "chunked").body(()).unwrap();
        assert_eq!(Message::outbound_request(head).body_size().unwrap(), BodySize::Chunked);

        let head = Request::builder().body(()).unwrap();
        assert_eq!(Message::outbound_request(head).body_size().unwrap(), BodySize::Empty);

        let head = Request::builder()
            .header("Content-Length", "42")
            .header("Transfer-Encoding", "chunked")
            .body(())
            .unwrap();
        assert!(Message::outbound_request(head).body_size().is_err());
    }

    #[test]
    fn error_status_detection() {
        let head = Response::builder().status(499).body(()).unwrap();
        assert!(Message::outbound_response(head).is_error_status());

        let head = Response::builder().status(200).body(()).unwrap();
        assert!(!Message::outbound_response(head).is_error_status());

        assert!(!Message::inbound_request().is_error_status());
    }
}
