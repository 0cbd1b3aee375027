//! Stream transport: one POST whose response body is an open-ended event
//! stream. Frames are handed to a callback as they arrive; the callback is
//! never invoked after the cancellation token fires.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::request::ChatRequest;
use crate::sse::{SseFrame, SseParser};

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamClose {
    /// Server closed the response body.
    Finished,
    /// The cancellation token fired; the connection was torn down without
    /// waiting for server acknowledgment.
    Cancelled,
}

/// Frame delivery callback. Invoked zero or more times per stream, in strict
/// arrival order, then exactly one terminal: `Ok(StreamClose)` or `Err`.
pub type FrameSink<'a> = &'a mut (dyn FnMut(SseFrame) + Send);

/// Credential seam: supplies the bearer token injected into the chat request.
/// How tokens are stored or refreshed is the auth collaborator's business.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed-token provider for tests and simple embedders.
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// No authorization header at all.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Transport seam. `HttpTransport` is the production implementation; tests
/// drive the engine with scripted implementations.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn stream(
        &self,
        request: ChatRequest,
        bearer: Option<String>,
        cancel: CancellationToken,
        on_frame: FrameSink<'_>,
    ) -> Result<StreamClose, ChatError>;
}

/// reqwest-backed transport. The connection stays open for as long as the
/// server streams; there is no implicit pause or visibility-based throttling.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
    idle_timeout: Option<std::time::Duration>,
}

fn transport_err(e: impl std::fmt::Display) -> ChatError {
    ChatError::Transport(e.to_string())
}

impl HttpTransport {
    pub fn new(config: &ChatConfig) -> Self {
        // No request timeout: the response body is expected to stay open.
        // Idle enforcement, when configured, happens per chunk read.
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            endpoint: config.endpoint.clone(),
            idle_timeout: config.idle_timeout,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn stream(
        &self,
        request: ChatRequest,
        bearer: Option<String>,
        cancel: CancellationToken,
        on_frame: FrameSink<'_>,
    ) -> Result<StreamClose, ChatError> {
        let mut req = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&request);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamClose::Cancelled),
            res = req.send() => res.map_err(transport_err)?,
        };
        let response = response.error_for_status().map_err(transport_err)?;

        tracing::debug!(endpoint = %self.endpoint, "chat stream opened");

        let mut body = response.bytes_stream();
        let mut parser = SseParser::new();

        loop {
            let chunk = if let Some(idle) = self.idle_timeout {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(StreamClose::Cancelled),
                    read = tokio::time::timeout(idle, body.next()) => match read {
                        Ok(chunk) => chunk,
                        Err(_) => {
                            return Err(ChatError::Transport(format!(
                                "no stream data for {:?}",
                                idle
                            )))
                        }
                    },
                }
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(StreamClose::Cancelled),
                    chunk = body.next() => chunk,
                }
            };

            match chunk {
                None => return Ok(StreamClose::Finished),
                Some(Err(e)) => return Err(transport_err(e)),
                Some(Ok(bytes)) => {
                    for frame in parser.feed(&bytes) {
                        // Frames may already be queued when stop() fires;
                        // re-check before every delivery.
                        if cancel.is_cancelled() {
                            return Ok(StreamClose::Cancelled);
                        }
                        on_frame(frame);
                    }
                }
            }
        }
    }
}
