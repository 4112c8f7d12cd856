//! Binary event-stream framing.
//!
//! Every message on the wire is a self-describing frame:
//! - A 12-byte prelude: total length, header block length, prelude CRC32
//! - A block of typed key/value headers (`:event-type` selects the payload schema)
//! - The payload bytes (JSON for every event this workspace understands)
//! - A trailing CRC32 over everything before it
//!
//! All integers are big-endian. Decoding works on borrowed byte slices and never
//! assumes the slice ends on a frame boundary.

pub mod codec;
pub mod error;
pub mod headers;
pub mod names;

pub use codec::{
    decode_frame, encode_frame, read_prelude, Frame, FrameConfig, Prelude, DEFAULT_MAX_FRAME_LENGTH,
    MESSAGE_CRC_LEN, MIN_FRAME_LEN, PRELUDE_LEN,
};
pub use error::{ChecksumKind, FrameError, HeaderFault, Result};
pub use headers::{encode_headers, parse_headers, HeaderBlock, HeaderValue, Headers};
pub use names::{
    CONTENT_TYPE, ERROR_CODE, ERROR_MESSAGE, EVENT_TYPE, EXCEPTION_TYPE, MESSAGE_TYPE,
};
