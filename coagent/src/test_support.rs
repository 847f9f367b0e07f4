//! Test-only helpers for building agent events and capturing responses.

use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use serde_json::{Value, json};

use crate::core::types::ActionStatus;
use crate::io::protocol::{ActionResponse, AgentEvent};
use crate::io::responder::Responder;

/// A complete three-line artifact as action arguments.
pub fn haiku_args() -> Value {
    json!({
        "japanese": ["五月雨を", "あつめて早し", "最上川"],
        "english": ["gathering the rains", "of early summer, how swift", "the Mogami River"]
    })
}

/// `ACTION` event. `status` is `"complete"` or anything else for executing.
pub fn action_event(
    id: &str,
    name: &str,
    status: &str,
    arguments: Value,
    requires_response: bool,
) -> AgentEvent {
    let status = match status {
        "complete" => ActionStatus::Complete,
        _ => ActionStatus::Executing,
    };
    AgentEvent::Action {
        id: Some(id.to_string()),
        name: name.to_string(),
        status,
        arguments,
        requires_response,
    }
}

/// `STATE_SNAPSHOT` event for the default agent, without a stage.
pub fn snapshot_event(snapshot: Value) -> AgentEvent {
    AgentEvent::StateSnapshot {
        agent_name: Some("AG_UI".to_string()),
        node_name: None,
        snapshot,
    }
}

/// `STATE_SNAPSHOT` event reporting `stage`.
pub fn stage_event(stage: &str, snapshot: Value) -> AgentEvent {
    AgentEvent::StateSnapshot {
        agent_name: Some("AG_UI".to_string()),
        node_name: Some(stage.to_string()),
        snapshot,
    }
}

/// Responder that records what it was asked to send. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingResponder {
    sent: Arc<Mutex<Vec<ActionResponse>>>,
    fail: bool,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A responder whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn responses(&self) -> Vec<ActionResponse> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Responder for RecordingResponder {
    fn respond(&mut self, response: &ActionResponse) -> Result<()> {
        if self.fail {
            bail!("delivery failed");
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(response.clone()),
            Err(poisoned) => poisoned.into_inner().push(response.clone()),
        }
        Ok(())
    }
}
