//! Async decoding: a `tokio_util` codec plus a flattened event stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, BytesMut};
use futures_core::Stream;
use qstream_event::Event;
use qstream_frame::{read_prelude, FrameConfig};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;

use crate::assembler::{missing_bytes, step};
use crate::error::{Result, StreamError};

/// Decodes event-stream frames out of a `FramedRead` buffer.
///
/// Items are per-frame results; the codec's own error type is reserved for
/// fatal conditions (transport failure, truncation at EOF), which end the stream.
#[derive(Debug, Default)]
pub struct EventStreamCodec {
    config: FrameConfig,
    discard: usize,
}

impl EventStreamCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self { config, discard: 0 }
    }
}

impl Decoder for EventStreamCodec {
    type Item = Result<Event>;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let Some(step) = step(src, &mut self.discard, &self.config) else {
                if self.discard == 0 {
                    if let Some(prelude) = read_prelude(src) {
                        src.reserve((prelude.total_length as usize).saturating_sub(src.len()));
                    }
                }
                return Ok(None); // Need more data
            };
            src.advance(step.consumed);
            if let Some(item) = step.item {
                return Ok(Some(item));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if src.is_empty() {
            if self.discard > 0 {
                // Already reported by the frame error that started the skip.
                tracing::debug!(discard = self.discard, "stream ended inside a resync skip");
                self.discard = 0;
            }
            return Ok(None);
        }

        let err = StreamError::TruncatedStream {
            buffered: src.len(),
            missing: missing_bytes(src, self.discard),
        };
        tracing::warn!(error = %err, "response stream ended mid-frame");
        src.clear();
        self.discard = 0;
        Err(err)
    }
}

/// A stream of decoded events read from any `AsyncRead`.
///
/// Yields `Result<Event, StreamError>`; see [`StreamError::is_fatal`] for which
/// errors end the stream.
pub struct EventStream<R> {
    inner: FramedRead<R, EventStreamCodec>,
}

impl<R: AsyncRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, FrameConfig::default())
    }

    pub fn with_config(reader: R, config: FrameConfig) -> Self {
        Self {
            inner: FramedRead::new(reader, EventStreamCodec::with_config(config)),
        }
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Consume the stream and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: AsyncRead + Unpin> Stream for EventStream<R> {
    type Item = Result<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|item| item.map(|res| res.and_then(|inner| inner)))
    }
}

/// Decode a chunked response body, such as an HTTP client's byte stream.
///
/// Transport errors surface as [`StreamError::Transport`].
pub fn event_stream<S, B, E>(body: S, config: FrameConfig) -> EventStream<StreamReader<S, B>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: Buf + Unpin,
    E: Into<std::io::Error>,
{
    EventStream::with_config(StreamReader::new(body), config)
}
