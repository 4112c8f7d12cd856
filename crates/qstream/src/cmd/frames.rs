use std::io::Read;

use qstream_frame::{decode_frame, Frame, FrameConfig, FrameError};

use crate::cmd::{open_input, FramesArgs};
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{FramePrinter, OutputFormat};

pub fn run(args: FramesArgs, format: OutputFormat) -> CliResult<i32> {
    let mut input = open_input(&args.input)?;
    let mut data = Vec::new();
    input
        .read_to_end(&mut data)
        .map_err(|err| io_error("read failed", err))?;

    let config = if args.strict {
        FrameConfig::strict()
    } else {
        FrameConfig::default()
    };

    let mut printer = FramePrinter::new(format);
    let mut failed = false;
    let trailing = walk(&data, &config, |offset, entry| match entry {
        Entry::Frame(frame) => printer.frame(offset, frame),
        Entry::Error { err, skipped } => {
            failed = true;
            printer.error(offset, skipped, err);
        }
    });
    printer.finish();

    if trailing > 0 {
        tracing::warn!(
            offset = data.len() - trailing,
            trailing,
            "input ends with an incomplete frame"
        );
        return Ok(DATA_INVALID);
    }
    Ok(if failed { DATA_INVALID } else { SUCCESS })
}

enum Entry<'a> {
    Frame(&'a Frame),
    Error { err: &'a FrameError, skipped: usize },
}

/// Walk every frame in `data`, returning how many bytes were left over at the end.
fn walk<F>(data: &[u8], config: &FrameConfig, mut visit: F) -> usize
where
    F: FnMut(usize, Entry<'_>),
{
    let mut offset = 0;
    while offset < data.len() {
        let rest = &data[offset..];
        match decode_frame(rest, config) {
            Ok(Some(frame)) => {
                visit(offset, Entry::Frame(&frame));
                offset += frame.wire_size();
            }
            Ok(None) => break,
            Err(err) => {
                let skipped = err
                    .resync_len()
                    .unwrap_or(rest.len())
                    .min(rest.len());
                visit(
                    offset,
                    Entry::Error {
                        err: &err,
                        skipped,
                    },
                );
                offset += skipped;
            }
        }
    }

    data.len() - offset
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use qstream_frame::{encode_frame, Headers};

    use super::*;

    fn frame(wire: &mut BytesMut, event_type: &str, payload: &str) {
        let headers: Headers = [(":event-type", event_type)].into_iter().collect();
        encode_frame(&headers, payload.as_bytes(), wire).unwrap();
    }

    #[test]
    fn reports_offsets_of_each_frame() {
        let mut wire = BytesMut::new();
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"a"}"#);
        let second = wire.len();
        frame(&mut wire, "messageMetadataEvent", "{}");

        let mut seen = Vec::new();
        let trailing = walk(&wire, &FrameConfig::default(), |offset, entry| {
            if let Entry::Frame(frame) = entry {
                seen.push((offset, frame.headers.get_str(":event-type").map(str::to_string)));
            }
        });

        assert_eq!(trailing, 0);
        assert_eq!(
            seen,
            vec![
                (0, Some("assistantResponseEvent".to_string())),
                (second, Some("messageMetadataEvent".to_string())),
            ]
        );
    }

    #[test]
    fn skips_broken_frame_and_continues() {
        let mut wire = BytesMut::new();
        // total_length 20 with headers_length 10 cannot hold the framing overhead
        wire.extend_from_slice(&20u32.to_be_bytes());
        wire.extend_from_slice(&10u32.to_be_bytes());
        wire.extend_from_slice(&[0u8; 12]);
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"ok"}"#);

        let mut errors = Vec::new();
        let mut frames = 0;
        let trailing = walk(&wire, &FrameConfig::default(), |offset, entry| match entry {
            Entry::Frame(_) => frames += 1,
            Entry::Error { err, skipped } => errors.push((offset, err.label(), skipped)),
        });

        assert_eq!(trailing, 0);
        assert_eq!(frames, 1);
        assert_eq!(errors, vec![(0, "frame_integrity", 20)]);
    }

    #[test]
    fn leftover_partial_frame_is_reported() {
        let mut wire = BytesMut::new();
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"a"}"#);
        let whole = wire.len();
        frame(&mut wire, "assistantResponseEvent", r#"{"content":"b"}"#);
        wire.truncate(wire.len() - 5);

        let trailing = walk(&wire, &FrameConfig::default(), |_, _| {});
        assert_eq!(trailing, wire.len() - whole);
    }
}
