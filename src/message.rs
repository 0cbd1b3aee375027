use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
}

/// Attachment reference resolved by the upload collaborator before send().
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_id: String,
    pub file_name: String,
}

/// Transient progress signals, valid only while a message is in flight.
/// Stripped to defaults when the message is committed to history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProgressFlags {
    pub parsing_files: bool,
    pub retrieving_kb: bool,
    pub retrieved_chunks: u64,
}

/// One entry of the conversation log.
///
/// While an assistant message streams, `content` and `intermediate_steps` are
/// append-only and `tool_call_results` grows in arrival order. Once committed
/// the message is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    pub thinking_complete: bool,
    /// Reasoning narration streamed before the final answer.
    pub intermediate_steps: String,
    /// Structured tool-invocation outcomes; raw text falls back to a JSON string.
    pub tool_call_results: Vec<serde_json::Value>,
    /// Echo of the attachments sent with the corresponding user turn, so the
    /// UI can animate file processing.
    pub uploaded_files: Vec<UploadedFile>,
    #[serde(default)]
    pub progress: ProgressFlags,
}

impl ConversationMessage {
    pub fn human(content: String, uploaded_files: Vec<UploadedFile>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            role: Role::Human,
            content,
            thinking_complete: true,
            intermediate_steps: String::new(),
            tool_call_results: Vec::new(),
            uploaded_files,
            progress: ProgressFlags::default(),
        }
    }

    /// Pending assistant message created at send() time, before any frame
    /// has arrived.
    pub fn pending_assistant(uploaded_files: Vec<UploadedFile>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            role: Role::Assistant,
            content: String::new(),
            thinking_complete: false,
            intermediate_steps: String::new(),
            tool_call_results: Vec::new(),
            uploaded_files,
            progress: ProgressFlags::default(),
        }
    }
}
