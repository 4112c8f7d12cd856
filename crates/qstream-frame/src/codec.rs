use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ChecksumKind, FrameError, Result};
use crate::headers::{encode_headers, parse_headers, Headers};

/// Prelude: total length (4) + headers length (4) + prelude CRC (4) = 12 bytes.
pub const PRELUDE_LEN: usize = 12;

/// Trailing message CRC.
pub const MESSAGE_CRC_LEN: usize = 4;

/// Smallest well-formed frame: prelude + message CRC, no headers, no payload.
pub const MIN_FRAME_LEN: usize = PRELUDE_LEN + MESSAGE_CRC_LEN;

/// Default maximum frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// The fixed-size start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prelude {
    pub total_length: u32,
    pub headers_length: u32,
    pub prelude_crc: u32,
}

impl Prelude {
    /// Payload length implied by the length fields, if they are consistent.
    pub fn payload_length(&self) -> Option<usize> {
        (self.total_length as usize).checked_sub(self.headers_length as usize + MIN_FRAME_LEN)
    }

    /// Length consistency and size limits come first, so a corrupted length
    /// field reports as a frame integrity error even in strict mode.
    fn validate(&self, src: &[u8], config: &FrameConfig) -> Result<()> {
        if self.payload_length().is_none() {
            return Err(FrameError::LengthMismatch {
                total_length: self.total_length,
                headers_length: self.headers_length,
            });
        }
        if self.total_length as usize > config.max_frame_length {
            return Err(FrameError::FrameTooLarge {
                total_length: self.total_length,
                max: config.max_frame_length,
            });
        }
        if config.verify_checksums {
            let actual = crc32fast::hash(&src[..8]);
            if actual != self.prelude_crc {
                return Err(FrameError::ChecksumMismatch {
                    total_length: self.total_length,
                    kind: ChecksumKind::Prelude,
                    expected: self.prelude_crc,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// A decoded event-stream message.
///
/// The payload is owned: it does not borrow from the buffer the frame was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Total wire length, framing overhead included.
    pub total_length: u32,
    /// Length of the encoded header block.
    pub headers_length: u32,
    pub headers: Headers,
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame from headers and payload, computing both length fields.
    ///
    /// Lengths saturate at `u32::MAX`; [`Frame::encode`] rejects such frames.
    pub fn new(headers: Headers, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let headers_len = headers.encoded_len();
        let total = MIN_FRAME_LEN + headers_len + payload.len();
        Self {
            total_length: u32::try_from(total).unwrap_or(u32::MAX),
            headers_length: u32::try_from(headers_len).unwrap_or(u32::MAX),
            headers,
            payload,
        }
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.total_length as usize
    }

    /// Encode this frame, with valid checksums, onto `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&self.headers, &self.payload, dst)
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Verify the prelude and message CRC32s. Default: off.
    ///
    /// The prelude CRC is checked after the length fields, so an inconsistent or
    /// oversized length is still reported as `LengthMismatch` / `FrameTooLarge`.
    pub verify_checksums: bool,
    /// Maximum total frame length in bytes. Default: 16 MiB.
    pub max_frame_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            verify_checksums: false,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl FrameConfig {
    /// Default limits with checksum verification turned on.
    pub fn strict() -> Self {
        Self {
            verify_checksums: true,
            ..Self::default()
        }
    }
}

/// Read the prelude at the start of `src`, if 12 bytes are available.
pub fn read_prelude(src: &[u8]) -> Option<Prelude> {
    if src.len() < PRELUDE_LEN {
        return None;
    }
    Some(Prelude {
        total_length: be_u32(&src[0..4]),
        headers_length: be_u32(&src[4..8]),
        prelude_crc: be_u32(&src[8..12]),
    })
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────┬───────────┬─────────────┐
/// │ Total len  │ Header len │ Prelude    │ Headers      │ Payload   │ Message CRC │
/// │ (4B BE)    │ (4B BE)    │ CRC (4B)   │ (Header len) │           │ (4B BE)     │
/// └────────────┴────────────┴────────────┴──────────────┴───────────┴─────────────┘
/// ```
pub fn encode_frame(headers: &Headers, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let mut header_block = BytesMut::with_capacity(headers.encoded_len());
    encode_headers(headers, &mut header_block)?;

    let total = MIN_FRAME_LEN + header_block.len() + payload.len();
    let total_length =
        u32::try_from(total).map_err(|_| FrameError::EncodeTooLarge { size: total })?;

    let start = dst.len();
    dst.reserve(total);
    dst.put_u32(total_length);
    dst.put_u32(header_block.len() as u32);
    let prelude_crc = crc32fast::hash(&dst[start..start + 8]);
    dst.put_u32(prelude_crc);
    dst.put_slice(&header_block);
    dst.put_slice(payload);
    let message_crc = crc32fast::hash(&dst[start..]);
    dst.put_u32(message_crc);
    Ok(())
}

/// Decode one frame from the start of `src`.
///
/// Returns `Ok(None)` if `src` doesn't contain a complete frame yet; nothing is
/// consumed in that case. On success the frame occupies `frame.total_length`
/// bytes of `src`. On error, [`FrameError::resync_len`] gives the number of bytes
/// the caller should skip before trying again.
///
/// Length inconsistencies are reported as soon as the prelude is buffered,
/// without waiting for the declared body.
pub fn decode_frame(src: &[u8], config: &FrameConfig) -> Result<Option<Frame>> {
    let Some(prelude) = read_prelude(src) else {
        return Ok(None); // Need more data
    };
    prelude.validate(src, config)?;

    let total = prelude.total_length as usize;
    if src.len() < total {
        return Ok(None); // Need more data
    }
    let wire = &src[..total];

    if config.verify_checksums {
        let expected = be_u32(&wire[total - MESSAGE_CRC_LEN..]);
        let actual = crc32fast::hash(&wire[..total - MESSAGE_CRC_LEN]);
        if actual != expected {
            return Err(FrameError::ChecksumMismatch {
                total_length: prelude.total_length,
                kind: ChecksumKind::Message,
                expected,
                actual,
            });
        }
    }

    let headers_end = PRELUDE_LEN + prelude.headers_length as usize;
    let block = parse_headers(&wire[PRELUDE_LEN..headers_end]);
    if let Some(fault) = block.truncated {
        return Err(FrameError::HeaderTruncated {
            total_length: prelude.total_length,
            fault,
            partial: block.headers,
        });
    }

    let payload = Bytes::copy_from_slice(&wire[headers_end..total - MESSAGE_CRC_LEN]);
    tracing::trace!(
        total_length = prelude.total_length,
        headers_length = prelude.headers_length,
        payload_len = payload.len(),
        "decoded frame"
    );

    Ok(Some(Frame {
        total_length: prelude.total_length,
        headers_length: prelude.headers_length,
        headers: block.headers,
        payload,
    }))
}

fn be_u32(src: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&src[..4]);
    u32::from_be_bytes(raw)
}
