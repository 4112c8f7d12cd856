use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use qstream_decoder::StreamError;
use qstream_event::Event;
use qstream_frame::{Frame, FrameError};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    index: usize,
    event_type: &'a str,
    body: Value,
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    index: usize,
    error: &'a str,
    fatal: bool,
    message: String,
}

#[derive(Serialize)]
struct FrameLine<'a> {
    offset: usize,
    total_length: u32,
    headers_length: u32,
    payload_length: usize,
    headers: BTreeMap<&'a str, String>,
}

#[derive(Serialize)]
struct FrameErrorLine<'a> {
    offset: usize,
    error: &'a str,
    skipped: usize,
    message: String,
}

/// Prints decoded events one at a time; the table format is flushed by `finish`.
pub struct EventPrinter {
    format: OutputFormat,
    table: Option<Table>,
    index: usize,
}

impl EventPrinter {
    pub fn new(format: OutputFormat) -> Self {
        let table = matches!(format, OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "EVENT", "DETAIL"]);
            table
        });
        Self {
            format,
            table,
            index: 0,
        }
    }

    pub fn event(&mut self, event: &Event) {
        let index = self.next_index();
        let body = event_body(event);
        match self.format {
            OutputFormat::Json => {
                let line = EventLine {
                    index,
                    event_type: event.event_type(),
                    body,
                };
                print_json(&line);
            }
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        index.to_string(),
                        event.event_type().to_string(),
                        summary(event, &body),
                    ]);
                }
            }
            OutputFormat::Pretty => {
                println!("[{index}] {} {}", event.event_type(), summary(event, &body));
            }
        }
    }

    pub fn error(&mut self, err: &StreamError) {
        let index = self.next_index();
        match self.format {
            OutputFormat::Json => print_json(&ErrorLine {
                index,
                error: err.label(),
                fatal: err.is_fatal(),
                message: err.to_string(),
            }),
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        index.to_string(),
                        format!("error:{}", err.label()),
                        err.to_string(),
                    ]);
                }
            }
            OutputFormat::Pretty => println!("[{index}] error:{} {err}", err.label()),
        }
    }

    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }

    fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }
}

/// Prints the frame-level view used by `qstream frames`.
pub struct FramePrinter {
    format: OutputFormat,
    table: Option<Table>,
}

impl FramePrinter {
    pub fn new(format: OutputFormat) -> Self {
        let table = matches!(format, OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "TOTAL", "HEADERS", "PAYLOAD", "HEADER VALUES"]);
            table
        });
        Self { format, table }
    }

    pub fn frame(&mut self, offset: usize, frame: &Frame) {
        let headers: BTreeMap<&str, String> = frame
            .headers
            .iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        match self.format {
            OutputFormat::Json => print_json(&FrameLine {
                offset,
                total_length: frame.total_length,
                headers_length: frame.headers_length,
                payload_length: frame.payload.len(),
                headers,
            }),
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        offset.to_string(),
                        frame.total_length.to_string(),
                        frame.headers_length.to_string(),
                        frame.payload.len().to_string(),
                        join_headers(&headers, "\n"),
                    ]);
                }
            }
            OutputFormat::Pretty => println!(
                "@{offset} total={} headers={} payload={} {}",
                frame.total_length,
                frame.headers_length,
                frame.payload.len(),
                join_headers(&headers, " ")
            ),
        }
    }

    pub fn error(&mut self, offset: usize, skipped: usize, err: &FrameError) {
        match self.format {
            OutputFormat::Json => print_json(&FrameErrorLine {
                offset,
                error: err.label(),
                skipped,
                message: err.to_string(),
            }),
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        offset.to_string(),
                        format!("error:{}", err.label()),
                        String::new(),
                        String::new(),
                        format!("{err} (skipped {skipped} bytes)"),
                    ]);
                }
            }
            OutputFormat::Pretty => {
                println!("@{offset} error:{} {err} (skipped {skipped} bytes)", err.label())
            }
        }
    }

    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }
}

/// JSON view of an event's payload, in its wire field names.
pub fn event_body(event: &Event) -> Value {
    let body = match event {
        Event::AssistantResponse(msg) => serde_json::to_value(msg),
        Event::ToolUse(ev) => serde_json::to_value(ev),
        Event::Citation(ev) => serde_json::to_value(ev),
        Event::FollowupPrompt(ev) => serde_json::to_value(ev),
        Event::CodeReference(ev) => serde_json::to_value(ev),
        Event::MessageMetadata(ev) => serde_json::to_value(ev),
        Event::InvalidState(ev) => serde_json::to_value(ev),
        Event::Exception(exc) => Ok(json!({
            "exceptionType": exc.exception_type,
            "message": exc.message,
        })),
        Event::Unrecognized { payload, .. } => Ok(json!({
            "payloadSize": payload.len(),
            "payload": payload_preview(payload),
        })),
    };
    body.unwrap_or(Value::Null)
}

fn summary(event: &Event, body: &Value) -> String {
    match event.as_text() {
        Some(text) => text.to_string(),
        None => body.to_string(),
    }
}

fn join_headers(headers: &BTreeMap<&str, String>, sep: &str) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(sep)
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
