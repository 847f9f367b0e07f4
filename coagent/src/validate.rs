//! Validation of recorded agent event logs.
//!
//! Every line must be a JSON event matching the agent event schema, and every
//! state snapshot must satisfy the snapshot invariants.

use std::path::Path;

use anyhow::{Context, Result};
use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::core::invariants::validate_snapshot;
use crate::io::event_log::{EventLine, read_event_lines};
use crate::io::protocol::AgentEvent;

const AGENT_EVENT_SCHEMA: &str = include_str!("../schemas/agent_event.schema.json");

/// Outcome of validating an event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateReport {
    pub events: usize,
    /// One message per violation, prefixed with its line number.
    pub violations: Vec<String>,
}

impl ValidateReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

fn compile_schema() -> Result<Validator> {
    let schema: Value =
        serde_json::from_str(AGENT_EVENT_SCHEMA).context("parse agent event schema")?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile agent event schema")
}

/// Validate the event log at `path`.
pub fn validate_event_log(path: &Path) -> Result<ValidateReport> {
    let lines = read_event_lines(path)?;
    validate_lines(&lines)
}

/// Validate already-read event lines.
pub fn validate_lines(lines: &[EventLine]) -> Result<ValidateReport> {
    let validator = compile_schema()?;
    let mut report = ValidateReport {
        events: lines.len(),
        violations: Vec::new(),
    };

    for line in lines {
        let value: Value = match serde_json::from_str(&line.raw) {
            Ok(value) => value,
            Err(err) => {
                report
                    .violations
                    .push(format!("line {}: invalid json: {err}", line.line));
                continue;
            }
        };

        let schema_errors: Vec<String> = validator
            .iter_errors(&value)
            .map(|err| format!("line {}: {err}", line.line))
            .collect();
        if !schema_errors.is_empty() {
            report.violations.extend(schema_errors);
            continue;
        }

        let event: AgentEvent = match serde_json::from_value(value) {
            Ok(event) => event,
            Err(err) => {
                report
                    .violations
                    .push(format!("line {}: {err}", line.line));
                continue;
            }
        };
        if let AgentEvent::StateSnapshot {
            node_name,
            snapshot,
            ..
        } = &event
        {
            let state = AgentEvent::agent_state(snapshot, node_name.as_deref());
            report.violations.extend(
                validate_snapshot(&state)
                    .into_iter()
                    .map(|msg| format!("line {}: {msg}", line.line)),
            );
        }
    }

    Ok(report)
}
