//! View descriptors produced by the reconciliation layer.
//!
//! A view is data, not markup: it carries exactly what a renderer needs to
//! draw one of the four view kinds, and nothing about styling.

use serde::{Deserialize, Serialize};

use crate::core::types::{Artifact, SearchTopic, VerificationStep};

/// One row of a checklist (search progress or verification steps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistRow {
    pub label: String,
    pub completed: bool,
}

impl ChecklistRow {
    pub fn for_search(entry: &SearchTopic) -> Self {
        Self {
            label: format!(
                "Searching internet for recent information about {}",
                entry.topic
            ),
            completed: entry.completed,
        }
    }

    pub fn for_step(step: &VerificationStep) -> Self {
        let suffix = if step.completed {
            "completed"
        } else {
            "in progress"
        };
        Self {
            label: format!("{} - {}", step.task, suffix),
            completed: step.completed,
        }
    }
}

/// One Japanese line with its English counterpart at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairedLine {
    pub japanese: String,
    pub english: Option<String>,
}

/// A rendered haiku card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCard {
    pub lines: Vec<PairedLine>,
    /// True for the empty card shown while arguments are still streaming.
    pub placeholder: bool,
}

impl ArtifactCard {
    pub fn from_artifact(artifact: &Artifact) -> Self {
        let lines = artifact
            .japanese
            .iter()
            .enumerate()
            .map(|(index, line)| PairedLine {
                japanese: line.clone(),
                english: artifact.english.get(index).cloned(),
            })
            .collect();
        Self {
            lines,
            placeholder: false,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            lines: Vec::new(),
            placeholder: true,
        }
    }
}

/// Flavor of a blocking prompt. Decides which literal payloads are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Confirm,
    Verify,
}

/// How a prompt instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Rejected,
    AutoCompleted,
}

impl Outcome {
    /// Text shown in place of the controls once resolved.
    pub fn display(self) -> &'static str {
        match self {
            Outcome::Accepted | Outcome::AutoCompleted => "Accepted",
            Outcome::Rejected => "Rejected",
        }
    }
}

/// A confirmation or verification prompt tied to one action instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptView {
    pub action_id: String,
    pub action_name: String,
    pub kind: PromptKind,
    pub automatic: bool,
    /// Draft lines carried by the action, paired by index.
    pub lines: Vec<PairedLine>,
    /// Accept/reject controls are clickable.
    pub controls_enabled: bool,
    pub outcome: Option<Outcome>,
    /// Resolved display text, e.g. `Accepted`.
    pub outcome_text: Option<String>,
}

/// The descriptor produced for one processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    SearchProgress { rows: Vec<ChecklistRow> },
    Verification {
        steps: Vec<ChecklistRow>,
        japanese: Vec<String>,
        english: Vec<String>,
    },
    ArtifactCards { cards: Vec<ArtifactCard> },
    ConfirmationPrompt(PromptView),
    None,
}

impl View {
    pub fn is_none(&self) -> bool {
        matches!(self, View::None)
    }
}

/// Everything currently on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
    /// Welcome banner, shown until any conversation activity.
    pub welcome: bool,
    /// Progress or verification view for the latest snapshot, or `None`.
    pub state_view: View,
    pub cards: Vec<ArtifactCard>,
    pub prompts: Vec<PromptView>,
}

impl Default for RenderedPage {
    fn default() -> Self {
        Self {
            welcome: true,
            state_view: View::None,
            cards: Vec::new(),
            prompts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_pairs_lines_by_index() {
        let card = ArtifactCard::from_artifact(&Artifact {
            japanese: vec!["a".to_string(), "b".to_string()],
            english: vec!["A".to_string()],
        });
        assert_eq!(card.lines.len(), 2);
        assert_eq!(card.lines[0].english.as_deref(), Some("A"));
        assert_eq!(card.lines[1].english, None);
        assert!(!card.placeholder);
    }

    #[test]
    fn step_label_reflects_completion() {
        let pending = ChecklistRow::for_step(&VerificationStep {
            task: "Verifying".to_string(),
            completed: false,
        });
        assert_eq!(pending.label, "Verifying - in progress");
        let done = ChecklistRow::for_step(&VerificationStep {
            task: "Verifying".to_string(),
            completed: true,
        });
        assert_eq!(done.label, "Verifying - completed");
    }

    #[test]
    fn view_serializes_with_kind_tag() {
        let json = serde_json::to_value(View::None).expect("serialize");
        assert_eq!(json["kind"], "none");
    }
}
