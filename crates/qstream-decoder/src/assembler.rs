use bytes::{Buf, BytesMut};
use qstream_event::{classify, Event};
use qstream_frame::{decode_frame, read_prelude, FrameConfig, PRELUDE_LEN};

use crate::config::AssemblerConfig;
use crate::error::{Result, StreamError};

/// Lifecycle of one response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Nothing fed yet.
    Idle,
    /// Accepting chunks.
    Receiving,
    /// End of stream signalled; remaining frames may still be drained.
    Draining,
    /// Terminal.
    Closed,
}

/// Running counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub bytes_fed: u64,
    pub frames_decoded: u64,
    pub events: u64,
    pub frame_errors: u64,
    pub event_errors: u64,
    /// Bytes thrown away while resynchronising after frame errors.
    pub bytes_skipped: u64,
    pub compactions: u64,
}

/// Outcome of one decoding step over the unconsumed bytes.
pub(crate) struct Step {
    /// Bytes to advance past.
    pub consumed: usize,
    /// `None` when the step only discarded resync bytes.
    pub item: Option<Result<Event>>,
}

/// Decode at most one frame from `src`, honouring a pending resync skip.
///
/// Returns `None` when more data is needed; nothing is consumed in that case.
pub(crate) fn step(src: &[u8], discard: &mut usize, config: &FrameConfig) -> Option<Step> {
    if *discard > 0 {
        if src.is_empty() {
            return None;
        }
        let consumed = (*discard).min(src.len());
        *discard -= consumed;
        return Some(Step {
            consumed,
            item: None,
        });
    }

    match decode_frame(src, config) {
        Ok(None) => None,
        Ok(Some(frame)) => {
            let item = classify(&frame).map_err(|err| {
                tracing::warn!(error = %err, "dropping undecodable event payload");
                StreamError::from(err)
            });
            Some(Step {
                consumed: frame.wire_size(),
                item: Some(item),
            })
        }
        Err(err) => {
            let skip = err.resync_len().unwrap_or(PRELUDE_LEN);
            let consumed = skip.min(src.len());
            *discard = skip - consumed;
            tracing::warn!(error = %err, skip, "frame error, resynchronising");
            Some(Step {
                consumed,
                item: Some(Err(err.into())),
            })
        }
    }
}

/// Bytes still missing before `src` (plus any pending skip) would complete.
pub(crate) fn missing_bytes(src: &[u8], discard: usize) -> usize {
    if discard > 0 {
        return discard;
    }
    match read_prelude(src) {
        Some(prelude) => (prelude.total_length as usize).saturating_sub(src.len()),
        None => PRELUDE_LEN - src.len(),
    }
}

/// Reassembles frames from arbitrarily sized chunks and decodes them into events.
///
/// Single-consumer and not internally synchronised: one driving task calls
/// [`feed`](Self::feed) and [`drain`](Self::drain) in transport order, then
/// [`finish`](Self::finish) at end of stream.
///
/// The buffer is an owned arena with a read cursor. The consumed prefix is
/// dropped once the cursor passes `compact_threshold` and half the buffer, so
/// memory stays bounded by roughly one incomplete frame plus the threshold.
#[derive(Debug)]
pub struct StreamAssembler {
    buf: BytesMut,
    cursor: usize,
    discard: usize,
    state: AssemblerState,
    config: AssemblerConfig,
    stats: AssemblerStats,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    /// Create an assembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.initial_capacity),
            cursor: 0,
            discard: 0,
            state: AssemblerState::Idle,
            config,
            stats: AssemblerStats::default(),
        }
    }

    /// Append a chunk received from the transport.
    ///
    /// Returns [`StreamError::Closed`] once [`finish`](Self::finish) has been called.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        match self.state {
            AssemblerState::Draining | AssemblerState::Closed => return Err(StreamError::Closed),
            AssemblerState::Idle => self.state = AssemblerState::Receiving,
            AssemblerState::Receiving => {}
        }
        self.maybe_compact();
        self.buf.extend_from_slice(chunk);
        self.stats.bytes_fed += chunk.len() as u64;
        Ok(())
    }

    /// Decode every complete frame currently buffered.
    ///
    /// The returned iterator is lazy and stops as soon as the next frame is not
    /// fully buffered; those bytes stay put for the next [`feed`](Self::feed).
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { assembler: self }
    }

    /// Signal end of stream.
    ///
    /// - `Ok(())`: every byte was consumed; the assembler is now closed.
    /// - [`StreamError::Undrained`]: complete frames are still buffered. The
    ///   assembler stays in `Draining`; drain them and call `finish` again.
    /// - [`StreamError::TruncatedStream`]: the final frame never completed. The
    ///   assembler is closed. Bytes still owed to a resync skip do not count:
    ///   the frame error that started the skip was already yielded.
    /// - [`StreamError::Closed`]: already closed.
    pub fn finish(&mut self) -> Result<()> {
        if self.state == AssemblerState::Closed {
            return Err(StreamError::Closed);
        }
        self.state = AssemblerState::Draining;

        let remaining = &self.buf[self.cursor..];
        if remaining.is_empty() {
            if self.discard > 0 {
                // The frame error that started this skip already covers the range.
                tracing::debug!(
                    discard = self.discard,
                    "stream ended inside a resync skip"
                );
            }
            self.close();
            return Ok(());
        }

        let pending = if self.discard > 0 {
            !remaining.is_empty()
        } else {
            !matches!(decode_frame(remaining, &self.config.frame), Ok(None))
        };
        if pending {
            return Err(StreamError::Undrained {
                buffered: remaining.len(),
            });
        }

        let err = StreamError::TruncatedStream {
            buffered: remaining.len(),
            missing: missing_bytes(remaining, self.discard),
        };
        tracing::warn!(error = %err, "response stream ended mid-frame");
        self.close();
        Err(err)
    }

    /// Drop the consumed prefix of the buffer now, regardless of the threshold.
    pub fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        if self.cursor == self.buf.len() {
            self.buf.clear();
        } else {
            self.buf.advance(self.cursor);
        }
        tracing::debug!(
            dropped = self.cursor,
            remaining = self.buf.len(),
            "compacted stream buffer"
        );
        self.cursor = 0;
        self.stats.compactions += 1;
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.cursor
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn stats(&self) -> &AssemblerStats {
        &self.stats
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    fn next_item(&mut self) -> Option<Result<Event>> {
        if self.state == AssemblerState::Closed {
            return None;
        }
        loop {
            let step = step(
                &self.buf[self.cursor..],
                &mut self.discard,
                &self.config.frame,
            )?;
            self.cursor += step.consumed;

            match step.item {
                None => self.stats.bytes_skipped += step.consumed as u64,
                Some(Ok(event)) => {
                    self.stats.frames_decoded += 1;
                    self.stats.events += 1;
                    return Some(Ok(event));
                }
                Some(Err(err)) => {
                    match &err {
                        StreamError::Event(_) => {
                            self.stats.frames_decoded += 1;
                            self.stats.event_errors += 1;
                        }
                        _ => {
                            self.stats.frame_errors += 1;
                            self.stats.bytes_skipped += step.consumed as u64;
                        }
                    }
                    return Some(Err(err));
                }
            }
        }
    }

    fn maybe_compact(&mut self) {
        let fully_consumed = self.cursor == self.buf.len();
        let past_threshold = self.cursor >= self.config.compact_threshold
            && self.cursor.saturating_mul(2) >= self.buf.len();
        if self.cursor > 0 && (fully_consumed || past_threshold) {
            self.compact();
        }
    }

    fn close(&mut self) {
        self.state = AssemblerState::Closed;
        self.buf = BytesMut::new();
        self.cursor = 0;
        self.discard = 0;
    }
}

/// Lazy iterator returned by [`StreamAssembler::drain`].
///
/// Compacts the assembler's buffer when dropped.
pub struct Drain<'a> {
    assembler: &'a mut StreamAssembler,
}

impl Iterator for Drain<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.assembler.next_item()
    }
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        self.assembler.maybe_compact();
    }
}
