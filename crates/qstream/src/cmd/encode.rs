use std::fs::{self, OpenOptions};
use std::io::Write;

use bytes::BytesMut;
use qstream_frame::{encode_frame, Headers, CONTENT_TYPE, EVENT_TYPE, MESSAGE_TYPE};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let wire = build_frame(&args, &payload)?;

    match &args.out {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            file.write_all(&wire)
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
            tracing::debug!(path = %path.display(), bytes = wire.len(), "frame appended");
        }
        None => print_raw(&wire),
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(b"{}".to_vec())
}

fn build_frame(args: &EncodeArgs, payload: &[u8]) -> CliResult<BytesMut> {
    let headers: Headers = [
        (MESSAGE_TYPE, args.message_type.as_str()),
        (EVENT_TYPE, args.event_type.as_str()),
        (CONTENT_TYPE, "application/json"),
    ]
    .into_iter()
    .collect();

    let mut wire = BytesMut::new();
    encode_frame(&headers, payload, &mut wire).map_err(|err| frame_error("encode failed", err))?;
    Ok(wire)
}

#[cfg(test)]
mod tests {
    use qstream_event::{classify, Event};
    use qstream_frame::{decode_frame, FrameConfig};

    use super::*;

    fn args(event_type: &str, json: Option<&str>) -> EncodeArgs {
        EncodeArgs {
            event_type: event_type.into(),
            json: json.map(Into::into),
            file: None,
            message_type: "event".into(),
            out: None,
        }
    }

    #[test]
    fn encoded_frame_classifies_back() {
        let args = args("assistantResponseEvent", Some(r#"{"content":"hi"}"#));
        let payload = resolve_payload(&args).unwrap();
        let wire = build_frame(&args, &payload).unwrap();

        let frame = decode_frame(&wire, &FrameConfig::strict()).unwrap().unwrap();
        assert_eq!(frame.wire_size(), wire.len());
        assert_eq!(classify(&frame).unwrap().as_text(), Some("hi"));
    }

    #[test]
    fn default_payload_is_empty_object() {
        let args = args("messageMetadataEvent", None);
        let payload = resolve_payload(&args).unwrap();
        let wire = build_frame(&args, &payload).unwrap();
        let frame = decode_frame(&wire, &FrameConfig::default()).unwrap().unwrap();
        assert!(matches!(classify(&frame).unwrap(), Event::MessageMetadata(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = resolve_payload(&args("toolUseEvent", Some("{oops"))).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
