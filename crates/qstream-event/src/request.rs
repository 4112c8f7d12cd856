//! Outbound request body for opening an assistant-response stream.
//!
//! Built by the caller and sent by its HTTP layer; the decoder only consumes the
//! response. Serialisation drops every `None` field.

use serde::{Deserialize, Serialize};

use crate::model::{AssistantResponseMessage, UserIntent};

/// Top-level JSON body: `{"conversationState": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAssistantResponseRequest {
    pub conversation_state: ConversationState,
}

impl GenerateAssistantResponseRequest {
    pub fn new(conversation_state: ConversationState) -> Self {
        Self { conversation_state }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatTriggerType {
    #[default]
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatMessage>>,
    pub current_message: ChatMessage,
    pub chat_trigger_type: ChatTriggerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization_arn: Option<String>,
}

impl ConversationState {
    /// A manually triggered single user message with no history.
    pub fn manual(content: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            history: None,
            current_message: ChatMessage::UserInputMessage(UserInputMessage::new(content)),
            chat_trigger_type: ChatTriggerType::Manual,
            customization_arn: None,
        }
    }

    /// Continue an existing conversation.
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = Some(history);
        self
    }
}

/// One turn of a conversation, tagged by which side produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatMessage {
    UserInputMessage(UserInputMessage),
    AssistantResponseMessage(AssistantResponseMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input_message_context: Option<UserInputMessageContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_intent: Option<UserIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl UserInputMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            user_input_message_context: None,
            user_intent: None,
            origin: None,
            images: None,
            model_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    AiEditor,
    Chatbot,
    Cli,
    Console,
    Documentation,
    Gitlab,
    Ide,
    Marketing,
    Md,
    Mobile,
    OpensearchDashboard,
    SageMaker,
    ServiceInternal,
    UnifiedSearch,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Base64-encoded image bytes.
    pub bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub format: ImageFormat,
    pub source: ImageSource,
}

/// Client-side context attached to a user message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputMessageContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_state: Option<EditorState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_state: Option<ShellState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_state: Option<GitState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_state: Option<EnvState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<Vec<AdditionalContentEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocument {
    pub file_path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programming_language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub position: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<TextDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_state: Option<CursorState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_documents: Option<Vec<TextDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_relevant_documents: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_folders: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellHistoryEntry {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellState {
    pub shell_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_history: Option<Vec<ShellHistoryEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_changes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstaged_changes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub untracked_files: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Vec<EnvironmentVariable>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalContentEntry {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_use_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool input, as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn manual_request_shape() {
        let req = GenerateAssistantResponseRequest::new(ConversationState::manual("hello"));
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(
            value,
            json!({
                "conversationState": {
                    "currentMessage": {"userInputMessage": {"content": "hello"}},
                    "chatTriggerType": "MANUAL"
                }
            })
        );
    }

    #[test]
    fn conversation_id_and_history() {
        let state = ConversationState::manual("and then?")
            .with_conversation_id("c1")
            .with_history(vec![
                ChatMessage::UserInputMessage(UserInputMessage::new("hi")),
                ChatMessage::AssistantResponseMessage(AssistantResponseMessage::new("hello")),
            ]);
        let value = serde_json::to_value(GenerateAssistantResponseRequest::new(state)).unwrap();
        let state = &value["conversationState"];

        assert_eq!(state["conversationId"], "c1");
        assert_eq!(state["history"][0]["userInputMessage"]["content"], "hi");
        assert_eq!(
            state["history"][1]["assistantResponseMessage"]["content"],
            "hello"
        );
    }

    #[test]
    fn context_fields_are_camel_case() {
        let mut message = UserInputMessage::new("fix it");
        message.origin = Some(Origin::Cli);
        message.user_input_message_context = Some(UserInputMessageContext {
            shell_state: Some(ShellState {
                shell_name: "zsh".into(),
                shell_history: Some(vec![ShellHistoryEntry {
                    command: "cargo build".into(),
                    exit_code: Some(101),
                }]),
            }),
            git_state: Some(GitState {
                branch_name: Some("main".into()),
                ..GitState::default()
            }),
            ..UserInputMessageContext::default()
        });

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["origin"], "CLI");
        let ctx = &value["userInputMessageContext"];
        assert_eq!(ctx["shellState"]["shellHistory"][0]["exitCode"], 101);
        assert_eq!(ctx["gitState"], json!({"branchName": "main"}));
        assert!(ctx.get("envState").is_none());
    }

    #[test]
    fn request_roundtrips_through_json() {
        let req = GenerateAssistantResponseRequest::new(
            ConversationState::manual("q").with_conversation_id("c"),
        );
        let text = req.to_json().unwrap();
        let back: GenerateAssistantResponseRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn unknown_origin_deserializes() {
        let origin: Origin = serde_json::from_str(r#""SOMEWHERE_ELSE""#).unwrap();
        assert_eq!(origin, Origin::Unknown);
    }
}
