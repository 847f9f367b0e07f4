//! Shared deterministic types for the reconciliation core.
//!
//! These types describe what the agent streams to the UI. Decoding is lenient:
//! a field that is missing or has the wrong shape is treated as absent, never
//! as a failure of the whole snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One in-flight search query reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTopic {
    pub topic: String,
    #[serde(default)]
    pub completed: bool,
}

/// One verification step reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStep {
    pub task: String,
    #[serde(default)]
    pub completed: bool,
}

/// Verification progress plus the draft being verified.
///
/// Draft lines may be empty while the agent is still composing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    #[serde(default)]
    pub steps: Vec<VerificationStep>,
    #[serde(default, alias = "japanese")]
    pub draft_japanese: Vec<String>,
    #[serde(default, alias = "english")]
    pub draft_english: Vec<String>,
}

/// Latest agent state snapshot.
///
/// Every arrival fully replaces the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub search_progress: Option<Vec<SearchTopic>>,
    pub verification: Option<Verification>,
    pub current_node: Option<String>,
}

const SEARCH_PROGRESS_KEYS: &[&str] = &["searchProgress", "tavily_response"];
const VERIFICATION_KEYS: &[&str] = &["verification", "haiku_verification"];
const CURRENT_NODE_KEYS: &[&str] = &["currentNode", "current_node"];

impl AgentState {
    /// Decode a snapshot document field by field.
    ///
    /// Unknown fields are ignored. A recognized field with an unexpected shape
    /// is logged and treated as absent.
    pub fn from_value(doc: &Value) -> Self {
        Self {
            search_progress: decode_field(doc, SEARCH_PROGRESS_KEYS),
            verification: decode_field(doc, VERIFICATION_KEYS),
            current_node: decode_field(doc, CURRENT_NODE_KEYS),
        }
    }

    /// True when the search progress field carries at least one entry.
    pub fn has_search_progress(&self) -> bool {
        self.search_progress
            .as_ref()
            .is_some_and(|entries| !entries.is_empty())
    }
}

fn decode_field<T: serde::de::DeserializeOwned>(doc: &Value, keys: &[&str]) -> Option<T> {
    let (key, raw) = keys
        .iter()
        .find_map(|key| doc.get(*key).map(|raw| (*key, raw)))?;
    if raw.is_null() {
        return None;
    }
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(field = key, error = %err, "ignoring malformed snapshot field");
            None
        }
    }
}

/// Lifecycle status of an action event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionStatus {
    #[serde(alias = "inProgress", alias = "in-progress")]
    Executing,
    Complete,
}

/// Action arguments as they stream in.
///
/// Either sequence may be missing or partially filled before the action
/// completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionArgs {
    pub japanese: Option<Vec<String>>,
    pub english: Option<Vec<String>>,
}

impl ActionArgs {
    /// Decode arguments leniently; anything that is not a list of strings is absent.
    pub fn from_value(doc: &Value) -> Self {
        Self {
            japanese: string_list(doc.get("japanese")),
            english: string_list(doc.get("english")),
        }
    }

    /// Build the artifact these arguments describe, if both sequences are
    /// present and non-empty.
    pub fn complete_artifact(&self) -> Option<Artifact> {
        match (&self.japanese, &self.english) {
            (Some(japanese), Some(english)) if !japanese.is_empty() && !english.is_empty() => {
                Some(Artifact {
                    japanese: japanese.clone(),
                    english: english.clone(),
                })
            }
            _ => None,
        }
    }
}

fn string_list(raw: Option<&Value>) -> Option<Vec<String>> {
    let items = raw?.as_array()?;
    // Partially streamed arrays may hold nulls; keep only the lines that arrived.
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}

/// A named action emitted by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Instance identifier. Falls back to the action name when the agent omits it.
    pub id: String,
    pub name: String,
    pub status: ActionStatus,
    pub arguments: ActionArgs,
    pub requires_response: bool,
}

/// A finalized haiku. Equality is deep equality over both line sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub japanese: Vec<String>,
    pub english: Vec<String>,
}
