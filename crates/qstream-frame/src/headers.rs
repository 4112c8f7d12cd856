//! Header block encoding and decoding.
//!
//! A header block is a sequence of entries:
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────────┐
//! │ Name len │ Name     │ Type tag │ Value (layout depends on    │
//! │ (1B)     │ (UTF-8)  │ (1B)     │ the tag, see HeaderValue)   │
//! └──────────┴──────────┴──────────┴─────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, HeaderFault, Result};
use crate::names;

const TAG_BOOL_TRUE: u8 = 0;
const TAG_BOOL_FALSE: u8 = 1;
const TAG_BYTE: u8 = 2;
const TAG_SHORT: u8 = 3;
const TAG_INT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_BYTES: u8 = 6;
const TAG_STRING: u8 = 7;
const TAG_TIMESTAMP: u8 = 8;
const TAG_UUID: u8 = 9;

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Bytes(Bytes),
    String(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Uuid([u8; 16]),
}

impl HeaderValue {
    /// Wire type tag for this value.
    pub fn type_tag(&self) -> u8 {
        match self {
            HeaderValue::Bool(true) => TAG_BOOL_TRUE,
            HeaderValue::Bool(false) => TAG_BOOL_FALSE,
            HeaderValue::Byte(_) => TAG_BYTE,
            HeaderValue::Short(_) => TAG_SHORT,
            HeaderValue::Int(_) => TAG_INT,
            HeaderValue::Long(_) => TAG_LONG,
            HeaderValue::Bytes(_) => TAG_BYTES,
            HeaderValue::String(_) => TAG_STRING,
            HeaderValue::Timestamp(_) => TAG_TIMESTAMP,
            HeaderValue::Uuid(_) => TAG_UUID,
        }
    }

    /// The string contents, if this is a string header.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn encoded_value_len(&self) -> usize {
        match self {
            HeaderValue::Bool(_) => 0,
            HeaderValue::Byte(_) => 1,
            HeaderValue::Short(_) => 2,
            HeaderValue::Int(_) => 4,
            HeaderValue::Long(_) | HeaderValue::Timestamp(_) => 8,
            HeaderValue::Bytes(b) => 2 + b.len(),
            HeaderValue::String(s) => 2 + s.len(),
            HeaderValue::Uuid(_) => 16,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(v) => write!(f, "{v}"),
            HeaderValue::Byte(v) => write!(f, "{v}"),
            HeaderValue::Short(v) => write!(f, "{v}"),
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::Long(v) => write!(f, "{v}"),
            HeaderValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            HeaderValue::String(s) => f.write_str(s),
            HeaderValue::Timestamp(ms) => write!(f, "{ms}ms"),
            HeaderValue::Uuid(id) => {
                for (i, byte) in id.iter().enumerate() {
                    if matches!(i, 4 | 6 | 8 | 10) {
                        f.write_str("-")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::String(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::String(value)
    }
}

/// Header name → value mapping. A repeated name overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, HeaderValue>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the value it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Option<HeaderValue> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(name)
    }

    /// String view of a string-typed header. Other types return `None`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Size of this header block on the wire.
    pub fn encoded_len(&self) -> usize {
        self.entries
            .iter()
            .map(|(name, value)| 1 + name.len() + 1 + value.encoded_value_len())
            .sum()
    }
}

impl<K: Into<String>, V: Into<HeaderValue>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Result of parsing a header block.
///
/// Parsing never fails outright: whatever was decoded before a fault is kept in
/// `headers`, and `truncated` says where and why parsing stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    pub headers: Headers,
    pub truncated: Option<HeaderFault>,
}

impl HeaderBlock {
    pub fn is_complete(&self) -> bool {
        self.truncated.is_none()
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], HeaderFault> {
        let available = self.buf.len() - self.pos;
        if available < n {
            return Err(HeaderFault::Truncated {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> std::result::Result<[u8; N], HeaderFault> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> std::result::Result<u8, HeaderFault> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> std::result::Result<u16, HeaderFault> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// Decode a header block that is exactly `headers_length` bytes long.
pub fn parse_headers(block: &[u8]) -> HeaderBlock {
    let mut cursor = Cursor { buf: block, pos: 0 };
    let mut headers = Headers::new();

    while !cursor.is_empty() {
        match parse_entry(&mut cursor) {
            Ok((name, value)) => {
                if names::is_reserved(&name) && !names::is_known(&name) {
                    tracing::trace!(header = %name, "unrecognised reserved header");
                }
                if let Some(previous) = headers.insert(name.clone(), value) {
                    tracing::debug!(header = %name, %previous, "duplicate header, keeping last value");
                }
            }
            Err(fault) => {
                return HeaderBlock {
                    headers,
                    truncated: Some(fault),
                };
            }
        }
    }

    HeaderBlock {
        headers,
        truncated: None,
    }
}

fn parse_entry(cursor: &mut Cursor<'_>) -> std::result::Result<(String, HeaderValue), HeaderFault> {
    let name_offset = cursor.pos;
    let name_len = cursor.u8()? as usize;
    let name = std::str::from_utf8(cursor.take(name_len)?)
        .map_err(|_| HeaderFault::InvalidName {
            offset: name_offset,
        })?
        .to_string();

    let tag_offset = cursor.pos;
    let value = match cursor.u8()? {
        TAG_BOOL_TRUE => HeaderValue::Bool(true),
        TAG_BOOL_FALSE => HeaderValue::Bool(false),
        TAG_BYTE => HeaderValue::Byte(i8::from_be_bytes(cursor.array()?)),
        TAG_SHORT => HeaderValue::Short(i16::from_be_bytes(cursor.array()?)),
        TAG_INT => HeaderValue::Int(i32::from_be_bytes(cursor.array()?)),
        TAG_LONG => HeaderValue::Long(i64::from_be_bytes(cursor.array()?)),
        TAG_BYTES => {
            let len = cursor.u16()? as usize;
            HeaderValue::Bytes(Bytes::copy_from_slice(cursor.take(len)?))
        }
        TAG_STRING => {
            let len = cursor.u16()? as usize;
            HeaderValue::String(String::from_utf8_lossy(cursor.take(len)?).into_owned())
        }
        TAG_TIMESTAMP => HeaderValue::Timestamp(i64::from_be_bytes(cursor.array()?)),
        TAG_UUID => HeaderValue::Uuid(cursor.array()?),
        tag => {
            return Err(HeaderFault::UnknownType {
                offset: tag_offset,
                tag,
            })
        }
    };

    Ok((name, value))
}

/// Encode a header block into `dst`.
pub fn encode_headers(headers: &Headers, dst: &mut BytesMut) -> Result<()> {
    dst.reserve(headers.encoded_len());
    for (name, value) in headers.iter() {
        let name_len = u8::try_from(name.len()).map_err(|_| FrameError::HeaderNameTooLong {
            name: name.to_string(),
            len: name.len(),
        })?;
        dst.put_u8(name_len);
        dst.put_slice(name.as_bytes());
        dst.put_u8(value.type_tag());

        match value {
            HeaderValue::Bool(_) => {}
            HeaderValue::Byte(v) => dst.put_i8(*v),
            HeaderValue::Short(v) => dst.put_i16(*v),
            HeaderValue::Int(v) => dst.put_i32(*v),
            HeaderValue::Long(v) | HeaderValue::Timestamp(v) => dst.put_i64(*v),
            HeaderValue::Bytes(b) => put_sized(dst, name, b)?,
            HeaderValue::String(s) => put_sized(dst, name, s.as_bytes())?,
            HeaderValue::Uuid(id) => dst.put_slice(id),
        }
    }
    Ok(())
}

fn put_sized(dst: &mut BytesMut, name: &str, value: &[u8]) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| FrameError::HeaderValueTooLong {
        name: name.to_string(),
        len: value.len(),
    })?;
    dst.put_u16(len);
    dst.put_slice(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_entry(name: &str, value: &str) -> Vec<u8> {
        let mut out = vec![name.len() as u8];
        out.extend_from_slice(name.as_bytes());
        out.push(TAG_STRING);
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(value.as_bytes());
        out
    }

    #[test]
    fn parses_string_headers() {
        let mut block = string_entry(":event-type", "messageMetadataEvent");
        block.extend(string_entry(":content-type", "application/json"));

        let parsed = parse_headers(&block);
        assert!(parsed.is_complete());
        assert_eq!(parsed.headers.len(), 2);
        assert_eq!(
            parsed.headers.get_str(":event-type"),
            Some("messageMetadataEvent")
        );
        assert_eq!(
            parsed.headers.get_str(":content-type"),
            Some("application/json")
        );
    }

    #[test]
    fn empty_block_has_no_headers() {
        let parsed = parse_headers(&[]);
        assert!(parsed.is_complete());
        assert!(parsed.headers.is_empty());
    }

    #[test]
    fn duplicate_names_keep_last_value() {
        let mut block = string_entry(":event-type", "first");
        block.extend(string_entry(":event-type", "second"));

        let parsed = parse_headers(&block);
        assert_eq!(parsed.headers.len(), 1);
        assert_eq!(parsed.headers.get_str(":event-type"), Some("second"));
    }

    #[test]
    fn truncated_value_keeps_earlier_headers() {
        let mut block = string_entry(":message-type", "event");
        let second = string_entry(":event-type", "toolUseEvent");
        block.extend_from_slice(&second[..second.len() - 3]);

        let parsed = parse_headers(&block);
        assert_eq!(parsed.headers.get_str(":message-type"), Some("event"));
        assert!(parsed.headers.get(":event-type").is_none());
        assert!(matches!(
            parsed.truncated,
            Some(HeaderFault::Truncated { needed: 12, available: 9, .. })
        ));
    }

    #[test]
    fn truncated_inside_name() {
        let block = [5u8, b'a', b'b'];
        let parsed = parse_headers(&block);
        assert!(parsed.headers.is_empty());
        assert_eq!(
            parsed.truncated,
            Some(HeaderFault::Truncated {
                offset: 1,
                needed: 5,
                available: 2
            })
        );
    }

    #[test]
    fn unknown_type_tag_stops_parsing() {
        let mut block = string_entry("a", "b");
        block.extend_from_slice(&[1, b'x', 42, 0, 0]);

        let parsed = parse_headers(&block);
        assert_eq!(parsed.headers.get_str("a"), Some("b"));
        assert!(matches!(
            parsed.truncated,
            Some(HeaderFault::UnknownType { tag: 42, .. })
        ));
    }

    #[test]
    fn invalid_utf8_name_is_a_fault() {
        let block = [2u8, 0xff, 0xfe, TAG_BOOL_TRUE];
        let parsed = parse_headers(&block);
        assert_eq!(
            parsed.truncated,
            Some(HeaderFault::InvalidName { offset: 0 })
        );
    }

    #[test]
    fn string_values_decode_lossily() {
        let mut block = vec![1u8, b'k', TAG_STRING, 0, 2];
        block.extend_from_slice(&[0xff, b'a']);

        let parsed = parse_headers(&block);
        assert!(parsed.is_complete());
        assert_eq!(parsed.headers.get_str("k"), Some("\u{fffd}a"));
    }

    #[test]
    fn typed_values_roundtrip() {
        let headers: Headers = [
            ("t", HeaderValue::Bool(true)),
            ("f", HeaderValue::Bool(false)),
            ("b", HeaderValue::Byte(-3)),
            ("s", HeaderValue::Short(-300)),
            ("i", HeaderValue::Int(70_000)),
            ("l", HeaderValue::Long(-5_000_000_000)),
            ("raw", HeaderValue::Bytes(Bytes::from_static(&[0, 1, 2]))),
            ("str", HeaderValue::from("value")),
            ("ts", HeaderValue::Timestamp(1_700_000_000_000)),
            ("id", HeaderValue::Uuid([7; 16])),
        ]
        .into_iter()
        .collect();

        let mut buf = BytesMut::new();
        encode_headers(&headers, &mut buf).unwrap();
        assert_eq!(buf.len(), headers.encoded_len());

        let parsed = parse_headers(&buf);
        assert!(parsed.is_complete());
        assert_eq!(parsed.headers, headers);
    }

    #[test]
    fn non_string_header_has_no_str_view() {
        let headers: Headers = [(":event-type", HeaderValue::Int(1))].into_iter().collect();
        assert_eq!(headers.get_str(":event-type"), None);
    }

    #[test]
    fn encode_rejects_long_name() {
        let headers: Headers = [("n".repeat(300), HeaderValue::Bool(true))]
            .into_iter()
            .collect();
        let err = encode_headers(&headers, &mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, FrameError::HeaderNameTooLong { len: 300, .. }));
    }

    #[test]
    fn encode_rejects_long_string_value() {
        let headers: Headers = [("k", "v".repeat(70_000))].into_iter().collect();
        let err = encode_headers(&headers, &mut BytesMut::new()).unwrap_err();
        assert!(matches!(err, FrameError::HeaderValueTooLong { len: 70_000, .. }));
    }

    #[test]
    fn uuid_display_is_hyphenated() {
        let value = HeaderValue::Uuid([0xab; 16]);
        assert_eq!(
            value.to_string(),
            "abababab-abab-abab-abab-abababababab"
        );
    }
}
