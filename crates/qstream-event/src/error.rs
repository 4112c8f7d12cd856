use crate::event::EventKind;

/// Maximum number of payload bytes echoed back in error messages.
pub const PREVIEW_LEN: usize = 128;

/// Errors decoding a recognised event's payload.
///
/// These are scoped to one frame; the stream carries on with the next one.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The payload is not UTF-8.
    #[error("{kind} payload is not valid UTF-8: {source} (payload: {preview})")]
    InvalidUtf8 {
        kind: EventKind,
        source: std::str::Utf8Error,
        preview: String,
    },

    /// The payload is not valid JSON, or doesn't match the event's shape.
    #[error("malformed {kind} payload: {source} (payload: {preview})")]
    MalformedPayload {
        kind: EventKind,
        source: serde_json::Error,
        preview: String,
    },
}

impl EventError {
    /// The event type the payload was declared as.
    pub fn kind(&self) -> EventKind {
        match self {
            EventError::InvalidUtf8 { kind, .. } | EventError::MalformedPayload { kind, .. } => {
                *kind
            }
        }
    }

    /// Truncated, lossily decoded view of the offending payload.
    pub fn preview(&self) -> &str {
        match self {
            EventError::InvalidUtf8 { preview, .. }
            | EventError::MalformedPayload { preview, .. } => preview,
        }
    }
}

pub type Result<T> = std::result::Result<T, EventError>;

/// Lossy UTF-8 preview of at most [`PREVIEW_LEN`] payload bytes.
pub(crate) fn preview(payload: &[u8]) -> String {
    if payload.len() <= PREVIEW_LEN {
        return String::from_utf8_lossy(payload).into_owned();
    }
    let mut out = String::from_utf8_lossy(&payload[..PREVIEW_LEN]).into_owned();
    out.push_str("...");
    out
}
