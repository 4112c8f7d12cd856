use crate::codec::PRELUDE_LEN;
use crate::headers::Headers;

/// Which of the two frame checksums failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// CRC32 over the first 8 prelude bytes.
    Prelude,
    /// CRC32 over the whole frame minus the trailing 4 bytes.
    Message,
}

impl std::fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumKind::Prelude => f.write_str("prelude"),
            ChecksumKind::Message => f.write_str("message"),
        }
    }
}

/// Why a header block stopped parsing early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderFault {
    /// Not enough bytes left for the next field.
    #[error("header block truncated at offset {offset} (needed {needed} bytes, {available} available)")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The value type tag is outside the event-stream type table.
    #[error("unknown header value type {tag} at offset {offset}")]
    UnknownType { offset: usize, tag: u8 },

    /// The header name is not valid UTF-8.
    #[error("header name at offset {offset} is not valid UTF-8")]
    InvalidName { offset: usize },
}

/// Errors that can occur during frame encoding/decoding.
///
/// Decode errors are scoped to a single frame. [`FrameError::resync_len`] tells the
/// caller how many bytes to skip to reach the next frame boundary.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The prelude length fields contradict each other.
    #[error("inconsistent frame lengths (total {total_length}, headers {headers_length})")]
    LengthMismatch {
        total_length: u32,
        headers_length: u32,
    },

    /// The declared frame length exceeds the configured maximum.
    #[error("frame too large ({total_length} bytes, max {max})")]
    FrameTooLarge { total_length: u32, max: usize },

    /// The header block could not be parsed completely.
    #[error("malformed header block: {fault}")]
    HeaderTruncated {
        total_length: u32,
        fault: HeaderFault,
        /// Headers parsed before the fault.
        partial: Headers,
    },

    /// A CRC32 did not match the frame contents.
    #[error("{kind} checksum mismatch (expected {expected:#010x}, computed {actual:#010x})")]
    ChecksumMismatch {
        total_length: u32,
        kind: ChecksumKind,
        expected: u32,
        actual: u32,
    },

    /// The encoded frame would not fit the 32-bit length fields.
    #[error("frame too large to encode ({size} bytes)")]
    EncodeTooLarge { size: usize },

    /// A header name is longer than 255 bytes.
    #[error("header name too long ({len} bytes, max 255): {name}")]
    HeaderNameTooLong { name: String, len: usize },

    /// A string or byte-array header value is longer than 65535 bytes.
    #[error("header value for {name} too long ({len} bytes, max 65535)")]
    HeaderValueTooLong { name: String, len: usize },
}

impl FrameError {
    /// Bytes to skip, counted from the start of the failed frame, to resynchronise
    /// at the next frame boundary. `None` for encode-side errors.
    ///
    /// The skip is the declared total length, never less than the prelude, so a
    /// decoder always makes progress even on a zeroed length field.
    pub fn resync_len(&self) -> Option<usize> {
        let total = match self {
            FrameError::LengthMismatch { total_length, .. }
            | FrameError::FrameTooLarge { total_length, .. }
            | FrameError::HeaderTruncated { total_length, .. }
            | FrameError::ChecksumMismatch { total_length, .. } => *total_length as usize,
            FrameError::EncodeTooLarge { .. }
            | FrameError::HeaderNameTooLong { .. }
            | FrameError::HeaderValueTooLong { .. } => return None,
        };
        Some(total.max(PRELUDE_LEN))
    }

    /// Short machine-friendly label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            FrameError::LengthMismatch { .. } | FrameError::FrameTooLarge { .. } => {
                "frame_integrity"
            }
            FrameError::HeaderTruncated { .. } => "header_truncation",
            FrameError::ChecksumMismatch { .. } => "checksum_mismatch",
            FrameError::EncodeTooLarge { .. }
            | FrameError::HeaderNameTooLong { .. }
            | FrameError::HeaderValueTooLong { .. } => "encode",
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
