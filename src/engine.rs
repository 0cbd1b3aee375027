//! Streaming message assembler: owns the in-flight assistant message, applies
//! stream events to it, and reconciles it into conversation history on every
//! terminal path (done, server error, transport failure, user stop).

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio_util::sync::CancellationToken;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::events::StreamEvent;
use crate::history::ConversationHistory;
use crate::message::ConversationMessage;
use crate::request::{ChatRequest, SendInput};
use crate::sse::SseFrame;
use crate::transport::{ChatTransport, StreamClose, TokenProvider};

/// Fixed assistant text shown when the stream fails for any non-user reason.
pub const STREAM_ERROR_TEXT: &str = "Something went wrong, please try again later.";
/// Marker appended to a message the user stopped mid-stream.
pub const STOP_MARKER: &str = "\n\n[Conversation stopped by user]";

/// Hook the presentation layer registers to be told "state changed, re-render".
/// Invoked on the next cooperative scheduling opportunity after a mutation,
/// never synchronously inside the event handler.
pub trait RenderNotifier: Send + Sync {
    fn render(&self);
}

/// Scrollable container association. Held weakly: the surface may detach and
/// reattach as the UI reconfigures, and a missing surface is a no-op.
pub trait ScrollSurface: Send + Sync {
    fn scroll_to_bottom(&self);
}

/// Phase of the in-flight assistant message. The Reasoning → Answering edge
/// fires on the first `final_answer` frame and never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Reasoning,
    Answering,
}

struct InFlight {
    message: ConversationMessage,
    phase: StreamPhase,
    cancel: CancellationToken,
}

struct EngineState {
    in_flight: Option<InFlight>,
    is_loading: bool,
    history: ConversationHistory,
    auto_scroll_enabled: bool,
}

struct Shared {
    state: Mutex<EngineState>,
    config: ChatConfig,
    transport: Arc<dyn ChatTransport>,
    tokens: Arc<dyn TokenProvider>,
    notifier: Mutex<Option<Arc<dyn RenderNotifier>>>,
    scroll: Mutex<Option<Weak<dyn ScrollSurface>>>,
}

/// The chat session engine. Cheap to clone; all clones share one session.
///
/// At most one assistant message is in flight at a time: `send` rejects with
/// [`ChatError::Busy`] while a stream is active. Must be used inside a tokio
/// runtime (each send spawns the task that drives the stream).
#[derive(Clone)]
pub struct ChatEngine {
    shared: Arc<Shared>,
}

impl ChatEngine {
    pub fn new(
        config: ChatConfig,
        transport: Arc<dyn ChatTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    in_flight: None,
                    is_loading: false,
                    history: ConversationHistory::new(),
                    auto_scroll_enabled: true,
                }),
                config,
                transport,
                tokens,
                notifier: Mutex::new(None),
                scroll: Mutex::new(None),
            }),
        }
    }

    /// Start one chat turn. The user message is appended to history before
    /// this returns; the assistant response streams in on a spawned task.
    pub fn send(&self, input: SendInput, session_id: &str) -> Result<(), ChatError> {
        if input.message.trim().is_empty() && input.uploaded_files.is_empty() {
            return Err(ChatError::Validation(
                "message is empty and carries no attachments".into(),
            ));
        }

        let cancel = CancellationToken::new();
        {
            let mut state = lock(&self.shared.state);
            if state.in_flight.is_some() {
                return Err(ChatError::Busy);
            }
            state.is_loading = true;
            state.history.add_user_message(ConversationMessage::human(
                input.message.clone(),
                input.uploaded_files.clone(),
            ));
            state.in_flight = Some(InFlight {
                message: ConversationMessage::pending_assistant(input.uploaded_files.clone()),
                phase: StreamPhase::Reasoning,
                cancel: cancel.clone(),
            });
        }
        schedule_render(&self.shared);

        let request = ChatRequest::new(
            session_id,
            &input,
            &self.shared.config.default_agent_config,
            self.shared.config.enable_knowledge_base_retrieval,
        );

        tracing::info!(session_id, "chat turn started");
        let shared = self.shared.clone();
        tokio::spawn(async move {
            drive_stream(shared, request, cancel).await;
        });
        Ok(())
    }

    /// Abort the in-flight stream, if any. The partial message is committed
    /// with [`STOP_MARKER`] appended; a stopped turn is never dropped
    /// silently. Idempotent, and a no-op without an active stream. After this
    /// returns no further frame reaches the message.
    pub fn stop(&self) {
        {
            let mut state = lock(&self.shared.state);
            match state.in_flight.as_mut() {
                Some(in_flight) => {
                    in_flight.cancel.cancel();
                    in_flight.message.content.push_str(STOP_MARKER);
                }
                None => {
                    // No stream means nothing is loading; complete() cleared
                    // both together.
                    debug_assert!(!state.is_loading);
                    return;
                }
            }
            complete(&mut state);
            tracing::info!("chat turn stopped by user");
        }
        schedule_render(&self.shared);
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.shared.state).is_loading
    }

    /// Snapshot of the message under construction, if a stream is active.
    pub fn streaming_message(&self) -> Option<ConversationMessage> {
        lock(&self.shared.state)
            .in_flight
            .as_ref()
            .map(|f| f.message.clone())
    }

    /// Snapshot of committed conversation history.
    pub fn history(&self) -> Vec<ConversationMessage> {
        lock(&self.shared.state).history.messages().to_vec()
    }

    /// Replace history wholesale, e.g. when the session store switches
    /// sessions. Rejected while a stream is in flight.
    pub fn load_history(&self, messages: Vec<ConversationMessage>) -> Result<(), ChatError> {
        let mut state = lock(&self.shared.state);
        if state.in_flight.is_some() {
            return Err(ChatError::Busy);
        }
        state.history.replace_all(messages);
        Ok(())
    }

    pub fn auto_scroll_enabled(&self) -> bool {
        lock(&self.shared.state).auto_scroll_enabled
    }

    pub fn set_auto_scroll(&self, enabled: bool) {
        lock(&self.shared.state).auto_scroll_enabled = enabled;
    }

    pub fn set_render_notifier(&self, notifier: Arc<dyn RenderNotifier>) {
        *lock(&self.shared.notifier) = Some(notifier);
    }

    pub fn attach_scroll_surface(&self, surface: Weak<dyn ScrollSurface>) {
        *lock(&self.shared.scroll) = Some(surface);
    }

    pub fn detach_scroll_surface(&self) {
        *lock(&self.shared.scroll) = None;
    }
}

/// Lock with poison recovery: a panicked holder leaves consistent-enough
/// state to keep serving (the engine only mutates under short critical
/// sections with no unwinding operations inside).
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drive one transport stream to its terminal condition.
async fn drive_stream(shared: Arc<Shared>, request: ChatRequest, cancel: CancellationToken) {
    let bearer = shared.tokens.bearer_token();
    let sink_shared = shared.clone();
    let mut on_frame = move |frame: SseFrame| {
        handle_frame(&sink_shared, &frame);
    };

    let outcome = shared
        .transport
        .stream(request, bearer, cancel, &mut on_frame)
        .await;

    match outcome {
        Ok(StreamClose::Finished) => {
            // Normal close; commits the message if no `done` frame already did.
            let committed = complete(&mut lock(&shared.state));
            if committed {
                schedule_render(&shared);
            }
            tracing::debug!("chat stream closed");
        }
        Ok(StreamClose::Cancelled) => {
            // stop() already committed the partial message; just make sure
            // the loading flag cannot stick.
            lock(&shared.state).is_loading = false;
        }
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "chat stream failed");
            let committed = {
                let mut state = lock(&shared.state);
                if let Some(in_flight) = state.in_flight.as_mut() {
                    in_flight.message.content = STREAM_ERROR_TEXT.to_string();
                }
                complete(&mut state)
            };
            if committed {
                schedule_render(&shared);
            }
        }
    }
}

/// Apply one frame under the state lock, then schedule a render pass if
/// anything changed. Frames arriving after commit (late deliveries) no-op.
fn handle_frame(shared: &Arc<Shared>, frame: &SseFrame) {
    let event = StreamEvent::from_frame(frame);
    let mutated = apply_event(&mut lock(&shared.state), event);
    if mutated {
        schedule_render(shared);
    }
}

fn apply_event(state: &mut EngineState, event: StreamEvent) -> bool {
    // Terminal events resolve the whole in-flight record.
    match event {
        StreamEvent::Done => return complete(state),
        StreamEvent::Error(detail) => {
            tracing::warn!(error = %detail, "stream reported server error");
            if let Some(in_flight) = state.in_flight.as_mut() {
                in_flight.message.content = STREAM_ERROR_TEXT.to_string();
            }
            return complete(state);
        }
        _ => {}
    }

    let Some(in_flight) = state.in_flight.as_mut() else {
        return false;
    };
    match event {
        StreamEvent::FileParseStart => in_flight.message.progress.parsing_files = true,
        StreamEvent::FileParseDone => in_flight.message.progress.parsing_files = false,
        StreamEvent::KbRetrievalStart => in_flight.message.progress.retrieving_kb = true,
        StreamEvent::KbRetrievalDone => in_flight.message.progress.retrieving_kb = false,
        StreamEvent::KbRetrievalChunkNum(n) => in_flight.message.progress.retrieved_chunks = n,
        StreamEvent::IntermediateSteps(text) => in_flight.message.intermediate_steps.push_str(&text),
        StreamEvent::ToolCallResults(value) => in_flight.message.tool_call_results.push(value),
        StreamEvent::FinalAnswer(text) => {
            if in_flight.phase == StreamPhase::Reasoning {
                in_flight.phase = StreamPhase::Answering;
                in_flight.message.thinking_complete = true;
            }
            in_flight.message.content.push_str(&text);
        }
        StreamEvent::Unknown => return false,
        // Handled above.
        StreamEvent::Done | StreamEvent::Error(_) => return false,
    }
    true
}

/// Commit the in-flight message (if any) and drop the loading flag. Safe to
/// call on every terminal path; only the first call per turn commits.
fn complete(state: &mut EngineState) -> bool {
    let committed = match state.in_flight.take() {
        Some(in_flight) => {
            state.history.commit(in_flight.message);
            true
        }
        None => false,
    };
    state.is_loading = false;
    committed
}

/// Ask the UI to re-render on the next scheduling tick, then auto-scroll when
/// enabled and a surface is attached.
fn schedule_render(shared: &Arc<Shared>) {
    let shared = shared.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;

        let notifier = lock(&shared.notifier).clone();
        if let Some(notifier) = notifier {
            notifier.render();
        }

        if !lock(&shared.state).auto_scroll_enabled {
            return;
        }
        let surface = lock(&shared.scroll).clone();
        if let Some(surface) = surface.and_then(|weak| weak.upgrade()) {
            surface.scroll_to_bottom();
        }
    });
}
