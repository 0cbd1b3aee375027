use serde::Serialize;

/// Crate-wide error type. Every fallible entry point returns `Result<T, ChatError>`.
/// Serializes as `{ error: "...", kind: "..." }` so the frontend gets structured
/// error messages.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Network or protocol failure before or during streaming. Not
    /// user-initiated; the engine converts it into a committed error message.
    #[error("Transport error: {0}")]
    Transport(String),

    /// User-initiated abort, distinguished from `Transport` by the
    /// cancellation token state.
    #[error("Stream cancelled")]
    Cancelled,

    /// Malformed structured payload in a frame. Recovered locally by falling
    /// back to raw text; surfaces only when a caller decodes explicitly.
    #[error("Payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A send() was issued while another stream is in flight.
    #[error("A chat stream is already in flight for this session")]
    Busy,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Stable machine-readable discriminant for the frontend.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Transport(_) => "transport",
            ChatError::Cancelled => "cancelled",
            ChatError::Decode(_) => "decode",
            ChatError::Busy => "busy",
            ChatError::Validation(_) => "validation",
            ChatError::Config(_) => "config",
        }
    }

    /// True when the error represents a user-initiated abort rather than a
    /// failure the user should be told about.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}

impl Serialize for ChatError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("ChatError", 2)?;
        s.serialize_field("error", &self.to_string())?;
        s.serialize_field("kind", self.kind())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(ChatError::Transport("x".into()).kind(), "transport");
        assert_eq!(ChatError::Cancelled.kind(), "cancelled");
        assert_eq!(ChatError::Busy.kind(), "busy");
        assert_eq!(ChatError::Validation("x".into()).kind(), "validation");
    }

    #[test]
    fn test_serializes_with_kind() {
        let json = serde_json::to_value(ChatError::Busy).unwrap();
        assert_eq!(json.get("kind").and_then(|k| k.as_str()), Some("busy"));
        assert!(json.get("error").is_some());
    }

    #[test]
    fn test_cancellation_detection() {
        assert!(ChatError::Cancelled.is_cancellation());
        assert!(!ChatError::Transport("reset".into()).is_cancellation());
    }
}
