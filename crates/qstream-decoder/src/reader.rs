use std::io::{ErrorKind, Read};

use qstream_event::Event;

use crate::assembler::StreamAssembler;
use crate::config::AssemblerConfig;
use crate::error::{Result, StreamError};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads decoded events from any `Read` stream (blocking).
///
/// Handles partial reads internally. Per-frame errors are yielded inline; the
/// iterator ends after end-of-stream, or after the first fatal error.
pub struct EventReader<T> {
    inner: T,
    assembler: StreamAssembler,
    chunk: Vec<u8>,
    done: bool,
}

impl<T: Read> EventReader<T> {
    /// Create a new event reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, AssemblerConfig::default())
    }

    /// Create a new event reader with explicit configuration.
    pub fn with_config(inner: T, config: AssemblerConfig) -> Self {
        Self {
            inner,
            assembler: StreamAssembler::with_config(config),
            chunk: vec![0u8; READ_CHUNK_SIZE],
            done: false,
        }
    }

    /// Read at most `size` bytes per call to the underlying stream.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk = vec![0u8; size.max(1)];
        self
    }

    /// Read the next event or per-frame error (blocking).
    ///
    /// Returns `None` once the stream has ended cleanly or a fatal error was
    /// returned.
    pub fn read_event(&mut self) -> Option<Result<Event>> {
        loop {
            if self.done {
                return None;
            }
            if let Some(item) = self.assembler.drain().next() {
                return Some(item);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return self.fail(StreamError::from(err)),
            };

            if read == 0 {
                self.done = true;
                return match self.assembler.finish() {
                    Ok(()) => None,
                    Err(err) => Some(Err(err)),
                };
            }

            if let Err(err) = self.assembler.feed(&self.chunk[..read]) {
                return self.fail(err);
            }
        }
    }

    fn fail(&mut self, err: StreamError) -> Option<Result<Event>> {
        self.done = true;
        Some(Err(err))
    }

    /// The assembler driving this reader, for state and statistics.
    pub fn assembler(&self) -> &StreamAssembler {
        &self.assembler
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for EventReader<T> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_event()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use qstream_frame::{encode_frame, Headers};

    use super::*;
    use crate::assembler::AssemblerState;

    fn wire(frames: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (event_type, payload) in frames {
            let headers: Headers = [(":event-type", *event_type)].into_iter().collect();
            encode_frame(&headers, payload.as_bytes(), &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn reads_events_in_order() {
        let bytes = wire(&[
            ("assistantResponseEvent", r#"{"content":"a"}"#),
            ("assistantResponseEvent", r#"{"content":"b"}"#),
            ("messageMetadataEvent", r#"{"conversationId":"c"}"#),
        ]);
        let reader = EventReader::new(Cursor::new(bytes));
        let events: Vec<_> = reader.map(|item| item.unwrap()).collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].as_text(), Some("a"));
        assert_eq!(events[1].as_text(), Some("b"));
        assert!(matches!(events[2], Event::MessageMetadata(_)));
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(&[("assistantResponseEvent", r#"{"content":"slow"}"#)]);
        let mut reader = EventReader::new(ByteByByteReader { bytes, pos: 0 });

        let event = reader.read_event().unwrap().unwrap();
        assert_eq!(event.as_text(), Some("slow"));
        assert!(reader.read_event().is_none());
        assert_eq!(reader.assembler().state(), AssemblerState::Closed);
    }

    #[test]
    fn small_chunk_size() {
        let bytes = wire(&[
            ("assistantResponseEvent", r#"{"content":"x"}"#),
            ("toolUseEvent", r#"{"toolUseId":"t","name":"n","stop":true}"#),
        ]);
        let reader = EventReader::new(Cursor::new(bytes)).with_chunk_size(3);
        assert_eq!(reader.filter(|item| item.is_ok()).count(), 2);
    }

    #[test]
    fn empty_stream_ends_cleanly() {
        let mut reader = EventReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_event().is_none());
        assert!(reader.read_event().is_none());
    }

    #[test]
    fn stream_closed_mid_frame() {
        let mut bytes = wire(&[("assistantResponseEvent", r#"{"content":"whole"}"#)]);
        let partial = wire(&[("assistantResponseEvent", r#"{"content":"cut"}"#)]);
        bytes.extend_from_slice(&partial[..partial.len() - 3]);

        let items: Vec<_> = EventReader::new(Cursor::new(bytes)).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(StreamError::TruncatedStream { missing: 3, .. })
        ));
    }

    #[test]
    fn per_frame_errors_do_not_stop_reading() {
        let bytes = wire(&[
            ("citationEvent", "{}"),
            ("assistantResponseEvent", r#"{"content":"fine"}"#),
        ]);
        let items: Vec<_> = EventReader::new(Cursor::new(bytes)).collect();

        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Err(StreamError::Event(_))));
        assert_eq!(items[1].as_ref().unwrap().as_text(), Some("fine"));
    }

    #[test]
    fn read_error_is_fatal_transport_error() {
        let mut reader = EventReader::new(FailingReader);
        let err = reader.read_event().unwrap().unwrap_err();
        assert!(matches!(err, StreamError::Transport(_)));
        assert!(reader.read_event().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(&[("assistantResponseEvent", r#"{"content":"ok"}"#)]);
        let mut reader = EventReader::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(bytes),
        });
        assert_eq!(
            reader.read_event().unwrap().unwrap().as_text(),
            Some("ok")
        );
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = EventReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
