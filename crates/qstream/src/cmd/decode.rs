use std::io::Read;

use qstream_decoder::{AssemblerConfig, AssemblerStats, EventReader, Result, StreamError};
use qstream_event::Event;

use crate::cmd::{open_input, DecodeArgs};
use crate::exit::{stream_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{EventPrinter, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(&args.input)?;
    let config = if args.strict {
        AssemblerConfig::strict()
    } else {
        AssemblerConfig::default()
    };

    let mut printer = EventPrinter::new(format);
    let outcome = decode(input, config, args.chunk_size as usize, |item| match item {
        Ok(event) => printer.event(event),
        Err(StreamError::Transport(_)) => {}
        Err(err) => printer.error(err),
    });
    printer.finish();

    let stats = &outcome.stats;
    tracing::info!(
        events = stats.events,
        frames = stats.frames_decoded,
        frame_errors = stats.frame_errors,
        event_errors = stats.event_errors,
        bytes_skipped = stats.bytes_skipped,
        "decode complete"
    );

    match outcome.fatal {
        Some(err @ StreamError::Transport(_)) => Err(stream_error("read failed", err)),
        Some(_) => Ok(DATA_INVALID),
        None if outcome.per_frame_errors > 0 => Ok(DATA_INVALID),
        None => Ok(SUCCESS),
    }
}

#[derive(Debug)]
struct Outcome {
    stats: AssemblerStats,
    per_frame_errors: usize,
    fatal: Option<StreamError>,
}

fn decode<R, F>(input: R, config: AssemblerConfig, chunk_size: usize, mut on_item: F) -> Outcome
where
    R: Read,
    F: FnMut(&Result<Event>),
{
    let mut reader = EventReader::with_config(input, config).with_chunk_size(chunk_size);
    let mut per_frame_errors = 0;
    let mut fatal = None;

    for item in reader.by_ref() {
        on_item(&item);
        match item {
            Ok(_) => {}
            Err(err) if err.is_fatal() => fatal = Some(err),
            Err(_) => per_frame_errors += 1,
        }
    }

    Outcome {
        stats: *reader.assembler().stats(),
        per_frame_errors,
        fatal,
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use bytes::BytesMut;
    use qstream_frame::{encode_frame, Headers};

    use super::*;

    fn frame(wire: &mut BytesMut, event_type: &str, payload: &str) {
        let headers: Headers = [(":message-type", "event"), (":event-type", event_type)]
            .into_iter()
            .collect();
        encode_frame(&headers, payload.as_bytes(), wire).unwrap();
    }

    #[test]
    fn collects_events_in_order() {
        let mut wire = BytesMut::new();
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"Hel"}"#);
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"lo"}"#);
        frame(&mut wire, "messageMetadataEvent", r#"{"conversationId":"c"}"#);

        let mut text = String::new();
        let outcome = decode(Cursor::new(wire.to_vec()), AssemblerConfig::default(), 3, |item| {
            if let Ok(event) = item {
                text.push_str(event.as_text().unwrap_or(""));
            }
        });

        assert_eq!(text, "Hello");
        assert_eq!(outcome.stats.events, 3);
        assert_eq!(outcome.per_frame_errors, 0);
        assert!(outcome.fatal.is_none());
    }

    #[test]
    fn counts_per_frame_errors_and_keeps_going() {
        let mut wire = BytesMut::new();
        frame(&mut wire, "toolUseEvent", "not json");
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"after"}"#);

        let mut seen = 0;
        let outcome = decode(Cursor::new(wire.to_vec()), AssemblerConfig::default(), 64, |_| {
            seen += 1
        });

        assert_eq!(seen, 2);
        assert_eq!(outcome.per_frame_errors, 1);
        assert_eq!(outcome.stats.event_errors, 1);
        assert!(outcome.fatal.is_none());
    }

    #[test]
    fn truncated_input_is_fatal() {
        let mut wire = BytesMut::new();
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"cut"}"#);
        let cut = wire.len() - 3;

        let outcome = decode(
            Cursor::new(wire[..cut].to_vec()),
            AssemblerConfig::default(),
            8,
            |_| {},
        );

        assert!(matches!(
            outcome.fatal,
            Some(StreamError::TruncatedStream { missing: 3, .. })
        ));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn read_failure_is_transport() {
        let outcome = decode(FailingReader, AssemblerConfig::default(), 8, |_| {});
        assert!(matches!(outcome.fatal, Some(StreamError::Transport(_))));
    }
}
