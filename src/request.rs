use serde::Serialize;

use crate::message::UploadedFile;

/// Per-turn agent settings carried in the request body. Wire contract is
/// snake_case; missing fields are omitted so the backend applies its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

/// Caller-side input for one chat turn.
#[derive(Debug, Clone, Default)]
pub struct SendInput {
    pub message: String,
    /// Attachment references already resolved by the upload collaborator.
    pub uploaded_files: Vec<UploadedFile>,
    /// Overrides the engine's default agent config when set.
    pub agent_config: Option<AgentConfig>,
}

/// JSON body POSTed to the chat endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub query: String,
    pub agent_config: AgentConfig,
    pub uploaded_files: Vec<UploadedFileWire>,
    pub enable_knowledge_base_retrieval: bool,
}

/// Wire form of an attachment reference (the UI-facing `UploadedFile` renames
/// to camelCase; the backend expects snake_case).
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFileWire {
    pub file_id: String,
    pub file_name: String,
}

impl From<&UploadedFile> for UploadedFileWire {
    fn from(file: &UploadedFile) -> Self {
        Self {
            file_id: file.file_id.clone(),
            file_name: file.file_name.clone(),
        }
    }
}

impl ChatRequest {
    pub fn new(
        session_id: &str,
        input: &SendInput,
        default_agent_config: &AgentConfig,
        enable_knowledge_base_retrieval: bool,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            query: input.message.clone(),
            agent_config: input
                .agent_config
                .clone()
                .unwrap_or_else(|| default_agent_config.clone()),
            uploaded_files: input.uploaded_files.iter().map(Into::into).collect(),
            enable_knowledge_base_retrieval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_snake_case() {
        let input = SendInput {
            message: "how is my glucose trending?".into(),
            uploaded_files: vec![UploadedFile {
                file_id: "f1".into(),
                file_name: "report.pdf".into(),
            }],
            agent_config: Some(AgentConfig {
                model: Some("qwen3-max".into()),
                max_iterations: Some(5),
                tools: Some(vec!["fetch_health_data".into()]),
            }),
        };
        let req = ChatRequest::new("sess-1", &input, &AgentConfig::default(), true);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["session_id"], "sess-1");
        assert_eq!(json["query"], "how is my glucose trending?");
        assert_eq!(json["agent_config"]["model"], "qwen3-max");
        assert_eq!(json["agent_config"]["max_iterations"], 5);
        assert_eq!(json["uploaded_files"][0]["file_id"], "f1");
        assert_eq!(json["uploaded_files"][0]["file_name"], "report.pdf");
        assert_eq!(json["enable_knowledge_base_retrieval"], true);
    }

    #[test]
    fn test_default_agent_config_applies_when_input_has_none() {
        let defaults = AgentConfig {
            model: Some("glm-4.7".into()),
            ..Default::default()
        };
        let req = ChatRequest::new("s", &SendInput::default(), &defaults, false);
        assert_eq!(req.agent_config.model.as_deref(), Some("glm-4.7"));
    }

    #[test]
    fn test_unset_agent_fields_omitted() {
        let req = ChatRequest::new("s", &SendInput::default(), &AgentConfig::default(), false);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["agent_config"].get("model").is_none());
        assert!(json["agent_config"].get("tools").is_none());
    }
}
