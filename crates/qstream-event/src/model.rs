//! Payload shapes for each recognised event type.
//!
//! Field names are camelCase on the wire. Optional fields may be absent or `null`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementaryWebLink {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

/// Licence attribution for generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_content_span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserIntent {
    ApplyCommonBestPractices,
    CiteSources,
    CodeGeneration,
    ExplainCodeSelection,
    ExplainLineByLine,
    GenerateCloudformationTemplate,
    GenerateUnitTests,
    ImproveCode,
    ShowExamples,
    SuggestAlternateImplementation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupPrompt {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_intent: Option<UserIntent>,
}

/// A completed tool invocation carried on an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub tool_use_id: String,
    pub name: String,
    /// Arbitrary JSON arguments.
    #[serde(default)]
    pub input: serde_json::Value,
}

/// `assistantResponseEvent`: a piece of assistant text.
///
/// Also used as a history entry in [`ChatMessage`](crate::request::ChatMessage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponseMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplementary_web_links: Option<Vec<SupplementaryWebLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_prompt: Option<FollowupPrompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_uses: Option<Vec<ToolUse>>,
}

impl AssistantResponseMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message_id: None,
            content: content.into(),
            supplementary_web_links: None,
            references: None,
            followup_prompt: None,
            tool_uses: None,
        }
    }
}

/// `toolUseEvent`: one slice of a streamed tool call.
///
/// `input` carries a fragment of the JSON arguments; fragments for the same
/// `tool_use_id` concatenate in arrival order until `stop` is `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseEvent {
    pub tool_use_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<bool>,
}

impl ToolUseEvent {
    pub fn is_final(&self) -> bool {
        self.stop.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CitationTarget {
    Paragraph,
    Sentence,
    Word,
}

/// `citationEvent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationEvent {
    pub target: CitationTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_text: Option<String>,
    pub citation_link: String,
}

/// `followupPromptEvent`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupPromptEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_prompt: Option<FollowupPrompt>,
}

/// `codeReferenceEvent`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReferenceEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
}

/// `messageMetadataEvent`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadataEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance_id: Option<String>,
}

/// Reasons the server gives for rejecting a conversation mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidStateReason {
    InvalidConversationState,
    InvalidRequestContent,
    InvalidAuthToken,
    /// Any reason this crate doesn't know about yet.
    #[serde(other)]
    Unknown,
}

/// `invalidStateEvent`: the server signalling a protocol-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidStateEvent {
    pub reason: InvalidStateReason,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_response_optional_fields() {
        let msg: AssistantResponseMessage = serde_json::from_str(
            r#"{
                "messageId": "m1",
                "content": "Use a BufReader.",
                "supplementaryWebLinks": [{"url": "https://doc.rust-lang.org", "title": "std"}],
                "followupPrompt": {"content": "Show an example", "userIntent": "SHOW_EXAMPLES"},
                "toolUses": [{"toolUseId": "t1", "name": "fs_read", "input": {"path": "a.rs"}}]
            }"#,
        )
        .unwrap();

        assert_eq!(msg.message_id.as_deref(), Some("m1"));
        assert_eq!(msg.supplementary_web_links.as_ref().unwrap()[0].snippet, None);
        assert_eq!(
            msg.followup_prompt.unwrap().user_intent,
            Some(UserIntent::ShowExamples)
        );
        let tools = msg.tool_uses.unwrap();
        assert_eq!(tools[0].input["path"], "a.rs");
        assert!(msg.references.is_none());
    }

    #[test]
    fn assistant_response_requires_content() {
        let err = serde_json::from_str::<AssistantResponseMessage>(r#"{"messageId":"m"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn invalid_state_reason_falls_back_to_unknown() {
        let ev: InvalidStateEvent =
            serde_json::from_str(r#"{"reason":"SOMETHING_NEW","message":"m"}"#).unwrap();
        assert_eq!(ev.reason, InvalidStateReason::Unknown);

        let ev: InvalidStateEvent =
            serde_json::from_str(r#"{"reason":"INVALID_AUTH_TOKEN","message":"expired"}"#)
                .unwrap();
        assert_eq!(ev.reason, InvalidStateReason::InvalidAuthToken);
    }

    #[test]
    fn citation_target_is_closed() {
        let err = serde_json::from_str::<CitationEvent>(
            r#"{"target":"CHAPTER","citationLink":"https://x"}"#,
        )
        .unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn tool_use_event_stop_flag() {
        let partial: ToolUseEvent =
            serde_json::from_str(r#"{"toolUseId":"t","name":"n","input":"{\"pa"}"#).unwrap();
        assert!(!partial.is_final());

        let last: ToolUseEvent =
            serde_json::from_str(r#"{"toolUseId":"t","name":"n","stop":true}"#).unwrap();
        assert!(last.is_final());
        assert!(last.input.is_none());
    }

    #[test]
    fn null_optionals_are_accepted() {
        let ev: MessageMetadataEvent =
            serde_json::from_str(r#"{"conversationId":null,"utteranceId":"u"}"#).unwrap();
        assert_eq!(ev.conversation_id, None);
        assert_eq!(ev.utterance_id.as_deref(), Some("u"));
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let json = serde_json::to_value(AssistantResponseMessage::new("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hi"}));
    }
}
