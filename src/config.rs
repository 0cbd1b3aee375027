use std::time::Duration;

use url::Url;

use crate::error::ChatError;
use crate::request::AgentConfig;

/// Engine configuration: where to stream from and how patient to be.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Full URL of the chat endpoint, e.g. `http://localhost:8088/api/chat`.
    pub endpoint: Url,
    /// Maximum wait for the next response chunk. `None` (the default)
    /// preserves the backend's long-running streams; set it to guard against
    /// silent hangs.
    pub idle_timeout: Option<Duration>,
    /// Agent settings applied when a send() carries none.
    pub default_agent_config: AgentConfig,
    /// Whether turns request knowledge-base retrieval.
    pub enable_knowledge_base_retrieval: bool,
}

impl ChatConfig {
    pub fn new(endpoint: &str) -> Result<Self, ChatError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ChatError::Config(format!("invalid chat endpoint '{}': {}", endpoint, e)))?;
        Ok(Self {
            endpoint,
            idle_timeout: None,
            default_agent_config: AgentConfig::default(),
            enable_knowledge_base_retrieval: true,
        })
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn with_default_agent_config(mut self, config: AgentConfig) -> Self {
        self.default_agent_config = config;
        self
    }

    pub fn with_knowledge_base_retrieval(mut self, enabled: bool) -> Self {
        self.enable_knowledge_base_retrieval = enabled;
        self
    }
}
