//! Typed stream events and the payload decoding rule shared by all of them.
//!
//! The backend delivers payloads inconsistently: plain text, JSON scalars, or
//! JSON objects wrapped as `{ "content": <value> }`. Decoding is normalized
//! here so every event type resolves its payload the same way.

use serde_json::Value;

use crate::sse::SseFrame;

/// Classified frame from the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    FileParseStart,
    FileParseDone,
    KbRetrievalStart,
    KbRetrievalDone,
    /// Number of knowledge-base chunks retrieved so far.
    KbRetrievalChunkNum(u64),
    /// Reasoning narration, appended to `intermediate_steps`.
    IntermediateSteps(String),
    /// Tool-invocation outcome; raw text falls back to a JSON string value.
    ToolCallResults(Value),
    /// Final-answer text chunk; the first one ends the reasoning phase.
    FinalAnswer(String),
    Done,
    /// Server-side failure; terminal like `Done`.
    Error(String),
    /// Forward-compatible: unrecognized event types are skipped.
    Unknown,
}

impl StreamEvent {
    /// Classify a parsed frame. Unrecognized event types and unparseable
    /// chunk counters map to `Unknown` rather than failing the stream.
    pub fn from_frame(frame: &SseFrame) -> StreamEvent {
        match frame.event.as_str() {
            "file_parse_start" => StreamEvent::FileParseStart,
            "file_parse_done" => StreamEvent::FileParseDone,
            "kb_retrieval_start" => StreamEvent::KbRetrievalStart,
            "kb_retrieval_done" => StreamEvent::KbRetrievalDone,
            "kb_retrieval_chunk_num" => match decode_count(&frame.data) {
                Some(n) => StreamEvent::KbRetrievalChunkNum(n),
                None => {
                    tracing::debug!(data = %frame.data, "unparseable kb chunk count");
                    StreamEvent::Unknown
                }
            },
            "intermediate_steps" => StreamEvent::IntermediateSteps(decode_text(&frame.data)),
            "tool_call_results" => StreamEvent::ToolCallResults(decode_value(&frame.data)),
            "final_answer" => StreamEvent::FinalAnswer(decode_text(&frame.data)),
            "done" => StreamEvent::Done,
            "error" => StreamEvent::Error(decode_text(&frame.data)),
            other => {
                tracing::debug!(event = other, "unknown stream event type");
                StreamEvent::Unknown
            }
        }
    }

    /// True for events that end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// Decode a payload to a JSON value: parse as JSON if possible, unwrap a
/// top-level `content` field, otherwise keep the raw text as a string value.
pub fn decode_value(data: &str) -> Value {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => match map.get("content") {
            Some(content) => content.clone(),
            None => Value::Object(map),
        },
        Ok(other) => other,
        Err(_) => Value::String(data.to_string()),
    }
}

/// Decode a payload to text via `decode_value`. A non-string resolved value
/// (e.g. a numeric `content` field) is rendered as its JSON text, so the
/// wrapper never leaks into displayed content.
pub fn decode_text(data: &str) -> String {
    match decode_value(data) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn decode_count(data: &str) -> Option<u64> {
    match decode_value(data) {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
