//! Live view configuration stored under `.coagent/config.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::pending::{ResolutionPolicy, ResponseLiterals};
use crate::core::view::PromptKind;

/// Environment variable that overrides `agent.endpoint_url`.
pub const ENDPOINT_ENV: &str = "REMOTE_ACTION_URL";

/// Canonical paths within `.coagent/` for a project root.
#[derive(Debug, Clone)]
pub struct CoagentPaths {
    pub root: PathBuf,
    pub coagent_dir: PathBuf,
    pub config_path: PathBuf,
}

impl CoagentPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let coagent_dir = root.join(".coagent");
        Self {
            root,
            config_path: coagent_dir.join("config.toml"),
            coagent_dir,
        }
    }
}

/// Live view configuration (TOML).
///
/// Missing fields default to the values the haiku agent expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoagentConfig {
    pub agent: AgentConfig,
    pub actions: ActionsConfig,
    /// Literal payloads sent back when a prompt resolves.
    pub messages: ResponseLiterals,
    pub suggestions: SuggestionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name used to scope state snapshots.
    pub name: String,
    /// Backend endpoint the agent runtime is reached at.
    pub endpoint_url: String,
    /// Stage that marks the start of a new conversation flow.
    pub start_stage: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "AG_UI".to_string(),
            endpoint_url: "http://localhost:8000/copilotkit".to_string(),
            start_stage: "start_flow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActionsConfig {
    /// Non-blocking action that renders the final artifact.
    pub render_action: String,
    /// Policy for prompts that do not set their own.
    pub default_policy: ResolutionPolicy,
    /// Delay before an automatic prompt resolves itself.
    pub auto_resolve_delay_ms: u64,
    /// Blocking actions rendered as prompts.
    pub prompts: Vec<PromptSpec>,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            render_action: "render_haiku".to_string(),
            default_policy: ResolutionPolicy::Manual,
            auto_resolve_delay_ms: 3000,
            prompts: vec![
                PromptSpec {
                    name: "confirm_changes".to_string(),
                    kind: PromptKind::Confirm,
                    policy: None,
                },
                PromptSpec {
                    name: "verify_haiku".to_string(),
                    kind: PromptKind::Verify,
                    policy: None,
                },
            ],
        }
    }
}

impl ActionsConfig {
    pub fn auto_resolve_delay(&self) -> Duration {
        Duration::from_millis(self.auto_resolve_delay_ms)
    }

    /// Prompt kind and policy for a blocking action, if it is configured.
    pub fn prompt_for(&self, name: &str) -> Option<(PromptKind, ResolutionPolicy)> {
        self.prompts
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| (spec.kind, spec.policy.unwrap_or(self.default_policy)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptSpec {
    pub name: String,
    pub kind: PromptKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ResolutionPolicy>,
}

/// Follow-up suggestion settings handed to the chat surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SuggestionsConfig {
    pub instructions: String,
    pub min_suggestions: u32,
    pub max_suggestions: u32,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            instructions: "Suggest short follow-up requests for a haiku about a recent news \
                           topic, such as a subject to write about or a change to the last haiku."
                .to_string(),
            min_suggestions: 1,
            max_suggestions: 6,
        }
    }
}

impl CoagentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.agent.name.trim().is_empty() {
            return Err(anyhow!("agent.name must be non-empty"));
        }
        if self.agent.start_stage.trim().is_empty() {
            return Err(anyhow!("agent.start_stage must be non-empty"));
        }
        if self.actions.render_action.trim().is_empty() {
            return Err(anyhow!("actions.render_action must be non-empty"));
        }
        if self.actions.auto_resolve_delay_ms == 0 {
            return Err(anyhow!("actions.auto_resolve_delay_ms must be > 0"));
        }
        let mut seen = HashSet::new();
        for spec in &self.actions.prompts {
            if spec.name == self.actions.render_action {
                return Err(anyhow!(
                    "actions.prompts: '{}' is already the render action",
                    spec.name
                ));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(anyhow!("actions.prompts: duplicate name '{}'", spec.name));
            }
        }
        if self.suggestions.max_suggestions == 0 {
            return Err(anyhow!("suggestions.max_suggestions must be > 0"));
        }
        if self.suggestions.min_suggestions > self.suggestions.max_suggestions {
            return Err(anyhow!(
                "suggestions.min_suggestions ({}) exceeds max_suggestions ({})",
                self.suggestions.min_suggestions,
                self.suggestions.max_suggestions
            ));
        }
        Ok(())
    }

    /// Replace the endpoint with `endpoint` when it is set and non-blank.
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        if let Some(url) = endpoint.filter(|url| !url.trim().is_empty()) {
            self.agent.endpoint_url = url;
        }
        self
    }
}

/// Load config from a TOML file, then apply the `REMOTE_ACTION_URL` override.
///
/// If the file is missing, starts from `CoagentConfig::default()`.
pub fn load_config(path: &Path) -> Result<CoagentConfig> {
    let cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        debug!(path = %path.display(), "config missing, using defaults");
        CoagentConfig::default()
    };
    let cfg = cfg.with_endpoint_override(std::env::var(ENDPOINT_ENV).ok());
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CoagentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
