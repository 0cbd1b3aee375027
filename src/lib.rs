//! Streaming chat session engine for the Vitala health assistant.
//!
//! One [`ChatEngine`] drives one conversation: [`ChatEngine::send`] appends
//! the user message, opens a server-push stream against the agent backend,
//! incrementally assembles the assistant reply from typed events (reasoning
//! narration, tool results, file-parsing and knowledge-base progress, final
//! answer), and commits the result into [`ConversationHistory`] on every
//! terminal path, including user-initiated [`ChatEngine::stop`] and
//! transport failure. The conversation log is never duplicated, truncated,
//! or left in a loading state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitala_chat::{ChatConfig, ChatEngine, HttpTransport, SendInput, StaticToken};
//!
//! # fn main() -> Result<(), vitala_chat::ChatError> {
//! let config = ChatConfig::new("http://localhost:8088/api/chat")?;
//! let transport = Arc::new(HttpTransport::new(&config));
//! let engine = ChatEngine::new(config, transport, Arc::new(StaticToken::new("token")));
//!
//! engine.send(
//!     SendInput {
//!         message: "How is my glucose trending this week?".into(),
//!         ..Default::default()
//!     },
//!     "session-1",
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod logging;
pub mod message;
pub mod options;
pub mod request;
pub mod sse;
pub mod transport;

pub use config::ChatConfig;
pub use engine::{ChatEngine, RenderNotifier, ScrollSurface, STOP_MARKER, STREAM_ERROR_TEXT};
pub use error::ChatError;
pub use events::StreamEvent;
pub use history::ConversationHistory;
pub use message::{ConversationMessage, ProgressFlags, Role, UploadedFile};
pub use request::{AgentConfig, ChatRequest, SendInput};
pub use sse::{SseFrame, SseParser};
pub use transport::{ChatTransport, HttpTransport, StaticToken, StreamClose, TokenProvider};
