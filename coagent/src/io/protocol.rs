//! Wire format between the agent backend and the live view.
//!
//! Inbound events are tagged JSON objects (`"type": "STATE_SNAPSHOT"`, ...).
//! Outbound responses carry one literal string per resolved action.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::{Action, ActionArgs, ActionStatus, AgentState};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Events streamed from the agent backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// Full replacement of the agent state document.
    #[serde(rename = "STATE_SNAPSHOT")]
    StateSnapshot {
        #[serde(rename = "agentName", default, skip_serializing_if = "Option::is_none")]
        agent_name: Option<String>,
        /// Stage the backend is executing. Takes precedence over the
        /// snapshot's own `currentNode`.
        #[serde(rename = "nodeName", default, skip_serializing_if = "Option::is_none")]
        node_name: Option<String>,
        #[serde(default)]
        snapshot: Value,
    },

    /// An action invocation, possibly with partial arguments.
    #[serde(rename = "ACTION")]
    Action {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        status: ActionStatus,
        /// Argument object, or its JSON text while it is still streaming.
        #[serde(default)]
        arguments: Value,
        #[serde(rename = "requiresResponse", default)]
        requires_response: bool,
    },

    /// A chat message became visible.
    #[serde(rename = "TEXT_MESSAGE")]
    TextMessage {
        role: MessageRole,
        #[serde(default)]
        content: String,
    },

    /// The component rendering an action was unmounted or replaced.
    #[serde(rename = "ACTION_TEARDOWN")]
    ActionTeardown { id: String },
}

impl AgentEvent {
    /// Decode the snapshot carried by a `STATE_SNAPSHOT` event, with the
    /// envelope stage applied.
    pub fn agent_state(snapshot: &Value, node_name: Option<&str>) -> AgentState {
        let mut state = AgentState::from_value(snapshot);
        if let Some(node) = node_name {
            state.current_node = Some(node.to_string());
        }
        state
    }

    /// Build the action carried by an `ACTION` event.
    ///
    /// Arguments given as JSON text are parsed; text that does not parse yet
    /// (a partial stream) yields empty arguments.
    pub fn action(
        id: Option<&str>,
        name: &str,
        status: ActionStatus,
        arguments: &Value,
        requires_response: bool,
    ) -> Action {
        let arguments = match arguments {
            Value::String(text) => serde_json::from_str::<Value>(text)
                .map(|parsed| ActionArgs::from_value(&parsed))
                .unwrap_or_default(),
            other => ActionArgs::from_value(other),
        };
        Action {
            id: id.unwrap_or(name).to_string(),
            name: name.to_string(),
            status,
            arguments,
            requires_response,
        }
    }
}

/// Decode one inbound event from JSON text.
pub fn decode_event(raw: &str) -> Result<AgentEvent> {
    serde_json::from_str(raw).context("decode agent event")
}

/// Response to a blocking action, sent back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action_id: String,
    pub action_name: String,
    pub payload: String,
}
