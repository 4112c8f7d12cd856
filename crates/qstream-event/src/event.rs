use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use qstream_frame::{Frame, HeaderValue, ERROR_CODE, ERROR_MESSAGE, EVENT_TYPE, EXCEPTION_TYPE, MESSAGE_TYPE};
use serde::de::DeserializeOwned;

use crate::error::{preview, EventError, Result};
use crate::model::{
    AssistantResponseMessage, CitationEvent, CodeReferenceEvent, FollowupPromptEvent,
    InvalidStateEvent, MessageMetadataEvent, ToolUseEvent,
};

/// The closed set of `:event-type` values this crate decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AssistantResponse,
    ToolUse,
    Citation,
    FollowupPrompt,
    CodeReference,
    MessageMetadata,
    InvalidState,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::AssistantResponse,
        EventKind::ToolUse,
        EventKind::Citation,
        EventKind::FollowupPrompt,
        EventKind::CodeReference,
        EventKind::MessageMetadata,
        EventKind::InvalidState,
    ];

    /// Exact, case-sensitive match on the header value.
    pub fn from_header(value: &str) -> Option<Self> {
        match value {
            "assistantResponseEvent" => Some(EventKind::AssistantResponse),
            "toolUseEvent" => Some(EventKind::ToolUse),
            "citationEvent" => Some(EventKind::Citation),
            "followupPromptEvent" => Some(EventKind::FollowupPrompt),
            "codeReferenceEvent" => Some(EventKind::CodeReference),
            "messageMetadataEvent" => Some(EventKind::MessageMetadata),
            "invalidStateEvent" => Some(EventKind::InvalidState),
            _ => None,
        }
    }

    /// The `:event-type` header value.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::AssistantResponse => "assistantResponseEvent",
            EventKind::ToolUse => "toolUseEvent",
            EventKind::Citation => "citationEvent",
            EventKind::FollowupPrompt => "followupPromptEvent",
            EventKind::CodeReference => "codeReferenceEvent",
            EventKind::MessageMetadata => "messageMetadataEvent",
            EventKind::InvalidState => "invalidStateEvent",
        }
    }

    fn decode(self, payload: &[u8]) -> Result<Event> {
        Ok(match self {
            EventKind::AssistantResponse => Event::AssistantResponse(self.parse(payload)?),
            EventKind::ToolUse => Event::ToolUse(self.parse(payload)?),
            EventKind::Citation => Event::Citation(self.parse(payload)?),
            EventKind::FollowupPrompt => Event::FollowupPrompt(self.parse(payload)?),
            EventKind::CodeReference => Event::CodeReference(self.parse(payload)?),
            EventKind::MessageMetadata => Event::MessageMetadata(self.parse(payload)?),
            EventKind::InvalidState => Event::InvalidState(self.parse(payload)?),
        })
    }

    fn parse<T: DeserializeOwned>(self, payload: &[u8]) -> Result<T> {
        let text = std::str::from_utf8(payload).map_err(|source| EventError::InvalidUtf8 {
            kind: self,
            source,
            preview: preview(payload),
        })?;
        serde_json::from_str(text).map_err(|source| EventError::MalformedPayload {
            kind: self,
            source,
            preview: preview(payload),
        })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A modelled exception or error frame sent by the service instead of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    /// `:exception-type` for exceptions, `:error-code` for errors.
    pub exception_type: String,
    pub message: Option<String>,
    pub payload: Bytes,
}

impl ServiceException {
    fn from_frame(frame: &Frame, message_type: &str) -> Self {
        if message_type == "error" {
            return Self {
                exception_type: frame.headers.get_str(ERROR_CODE).unwrap_or("unknown").to_string(),
                message: frame.headers.get_str(ERROR_MESSAGE).map(str::to_string),
                payload: frame.payload.clone(),
            };
        }

        let message = serde_json::from_slice::<serde_json::Value>(&frame.payload)
            .ok()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("Message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .or_else(|| {
                (!frame.payload.is_empty())
                    .then(|| String::from_utf8_lossy(&frame.payload).into_owned())
            });

        Self {
            exception_type: frame
                .headers
                .get_str(EXCEPTION_TYPE)
                .unwrap_or("unknown")
                .to_string(),
            message,
            payload: frame.payload.clone(),
        }
    }
}

/// One decoded message from the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AssistantResponse(AssistantResponseMessage),
    ToolUse(ToolUseEvent),
    Citation(CitationEvent),
    FollowupPrompt(FollowupPromptEvent),
    CodeReference(CodeReferenceEvent),
    MessageMetadata(MessageMetadataEvent),
    InvalidState(InvalidStateEvent),
    /// An exception or error frame (`:message-type` other than `event`).
    Exception(ServiceException),
    /// A frame whose `:event-type` is missing or not in [`EventKind`].
    Unrecognized {
        event_type: Option<String>,
        payload: Bytes,
    },
}

impl Event {
    /// The recognised kind, or `None` for exceptions and unrecognised frames.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Event::AssistantResponse(_) => Some(EventKind::AssistantResponse),
            Event::ToolUse(_) => Some(EventKind::ToolUse),
            Event::Citation(_) => Some(EventKind::Citation),
            Event::FollowupPrompt(_) => Some(EventKind::FollowupPrompt),
            Event::CodeReference(_) => Some(EventKind::CodeReference),
            Event::MessageMetadata(_) => Some(EventKind::MessageMetadata),
            Event::InvalidState(_) => Some(EventKind::InvalidState),
            Event::Exception(_) | Event::Unrecognized { .. } => None,
        }
    }

    /// A label for logs and output: the `:event-type` value where there is one.
    pub fn event_type(&self) -> &str {
        match self {
            Event::Exception(_) => "exception",
            Event::Unrecognized { event_type, .. } => event_type.as_deref().unwrap_or("<none>"),
            other => other.kind().map(EventKind::as_str).unwrap_or("<none>"),
        }
    }

    /// Assistant text carried by this event, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Event::AssistantResponse(msg) => Some(msg.content.as_str()),
            _ => None,
        }
    }

    /// True for events where the server reports that the conversation failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::InvalidState(_) | Event::Exception(_))
    }
}

/// Map a decoded frame onto its typed event.
///
/// Frames without `:message-type`, or with `:message-type: event`, are classified
/// by `:event-type`. Exception and error frames become [`Event::Exception`].
pub fn classify(frame: &Frame) -> Result<Event> {
    if let Some(message_type @ ("exception" | "error")) = frame.headers.get_str(MESSAGE_TYPE) {
        let exception = ServiceException::from_frame(frame, message_type);
        tracing::debug!(
            exception_type = %exception.exception_type,
            "service exception frame"
        );
        return Ok(Event::Exception(exception));
    }

    let raw = event_type_header(frame);
    let Some(kind) = raw.as_deref().and_then(EventKind::from_header) else {
        tracing::debug!(event_type = ?raw, "unrecognized event type");
        return Ok(Event::Unrecognized {
            event_type: raw.map(Cow::into_owned),
            payload: frame.payload.clone(),
        });
    };

    let event = kind.decode(&frame.payload)?;
    tracing::trace!(event_type = kind.as_str(), "classified event");
    Ok(event)
}

/// The `:event-type` value as text, whatever type tag it was sent with.
///
/// Byte arrays are read as lossy UTF-8; other typed values use their display form.
fn event_type_header(frame: &Frame) -> Option<Cow<'_, str>> {
    let value = frame.headers.get(EVENT_TYPE)?;
    let text = match value {
        HeaderValue::String(s) => Cow::Borrowed(s.as_str()),
        HeaderValue::Bytes(b) => String::from_utf8_lossy(b),
        other => Cow::Owned(other.to_string()),
    };
    if !matches!(value, HeaderValue::String(_)) {
        tracing::debug!(tag = value.type_tag(), event_type = %text, "coerced non-string event type");
    }
    Some(text)
}
