//! The host-framework contract the evaluator consumes.
//!
//! Deliberately minimal and framework-agnostic: a concrete hyper/axum/tonic
//! request or response is never named here. A host wires its own request
//! and response types into these traits; doing that wiring is the host's
//! job, not this crate's.

/// What the evaluator needs from an inbound request.
pub trait Request {
    /// The caller's address (already resolved by the host, e.g. from
    /// `X-Forwarded-For` or the peer socket).
    fn client_address(&self) -> &str;

    /// The matched route path, used as part of the default identifier and
    /// counter key.
    fn route_path(&self) -> &str;
}

/// What the evaluator needs from an outbound response, to write a rejection
/// onto it.
pub trait Response {
    /// Sets the HTTP status code.
    fn set_status(&mut self, status: u16);

    /// Sets (or replaces) a response header.
    fn set_header(&mut self, name: &str, value: &str);
}
