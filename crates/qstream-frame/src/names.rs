//! Well-known header names.
//!
//! Names starting with `:` are reserved for the protocol itself.
//! Any other name is application-defined and passed through untouched.

/// Selects the JSON payload schema of an event frame.
pub const EVENT_TYPE: &str = ":event-type";

/// `event`, `exception` or `error`.
pub const MESSAGE_TYPE: &str = ":message-type";

/// MIME type of the payload (usually `application/json`).
pub const CONTENT_TYPE: &str = ":content-type";

/// Modelled exception name, present when `:message-type` is `exception`.
pub const EXCEPTION_TYPE: &str = ":exception-type";

/// Error code, present when `:message-type` is `error`.
pub const ERROR_CODE: &str = ":error-code";

/// Human-readable error text, present when `:message-type` is `error`.
pub const ERROR_MESSAGE: &str = ":error-message";

/// Returns true if the header name is in the reserved `:`-prefixed namespace.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(':')
}

/// Returns true if the header name is one this workspace interprets.
pub fn is_known(name: &str) -> bool {
    matches!(
        name,
        EVENT_TYPE | MESSAGE_TYPE | CONTENT_TYPE | EXCEPTION_TYPE | ERROR_CODE | ERROR_MESSAGE
    )
}
