//! Model and tool catalogs surfaced by the frontend picker.

use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ToolOption {
    pub label: &'static str,
    pub value: &'static str,
    pub description: &'static str,
}

/// Models the agent backend accepts in `agent_config.model`.
pub const LLM_OPTIONS: &[ModelOption] = &[
    ModelOption {
        id: "qwen3-max",
        name: "Qwen3 Max",
        description: "Strongest Qwen-family model, suited to complex tasks",
    },
    ModelOption {
        id: "glm-4.7",
        name: "GLM-4.7",
        description: "Zhipu AI hybrid-reasoning model built for agents",
    },
    ModelOption {
        id: "kimi-k2.5",
        name: "Kimi-K2.5",
        description: "Most capable Kimi model to date, open-source SOTA on general tasks",
    },
];

/// MCP tools the agent may be granted in `agent_config.tools`.
pub const MCP_TOOL_OPTIONS: &[ToolOption] = &[
    ToolOption {
        label: "Diabetes knowledge graph",
        value: "search_diabetes_knowledge_graph",
        description: "Queries the DiaKG-built knowledge graph: clinical studies, \
                      medication usage, clinical cases, diagnosis and treatment",
    },
    ToolOption {
        label: "Health data lookup",
        value: "fetch_health_data",
        description: "Queries the user's health profile, glucose records, and exercise records",
    },
];
