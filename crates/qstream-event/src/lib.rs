//! Typed assistant-response events.
//!
//! A frame's `:event-type` header selects one of a closed set of JSON payload
//! shapes. [`classify`] maps a decoded [`Frame`](qstream_frame::Frame) onto the
//! matching [`Event`] variant. Unknown event types are not errors: they come back
//! as [`Event::Unrecognized`] so callers can log or ignore them.
//!
//! The [`request`] module holds the outbound request body a caller sends to open
//! a response stream. Nothing in the decoding path constructs it.

pub mod error;
pub mod event;
pub mod model;
pub mod request;

pub use error::{EventError, Result, PREVIEW_LEN};
pub use event::{classify, Event, EventKind, ServiceException};
pub use model::{
    AssistantResponseMessage, CitationEvent, CitationTarget, CodeReferenceEvent, FollowupPrompt,
    FollowupPromptEvent, InvalidStateEvent, InvalidStateReason, MessageMetadataEvent, Reference,
    Span, SupplementaryWebLink, ToolUse, ToolUseEvent, UserIntent,
};
pub use request::{
    ChatMessage, ChatTriggerType, ConversationState, GenerateAssistantResponseRequest,
    UserInputMessage, UserInputMessageContext,
};
