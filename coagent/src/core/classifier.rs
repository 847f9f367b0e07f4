//! Deterministic classification of agent state snapshots into views.

use crate::core::state_update::FlowState;
use crate::core::types::AgentState;
use crate::core::view::{ChecklistRow, View};

/// Classify a snapshot into `SearchProgress`, `Verification`, or `None`.
///
/// - `None` whenever the flow has an accepted artifact, whatever the snapshot holds.
/// - `SearchProgress` if the snapshot carries at least one search entry.
/// - `Verification` if the snapshot carries a verification document.
/// - `None` otherwise.
///
/// Search progress wins when both fields are populated.
pub fn classify_snapshot(snapshot: &AgentState, flow: &FlowState) -> View {
    if flow.accepted {
        return View::None;
    }

    if let Some(entries) = snapshot
        .search_progress
        .as_ref()
        .filter(|entries| !entries.is_empty())
    {
        return View::SearchProgress {
            rows: entries.iter().map(ChecklistRow::for_search).collect(),
        };
    }

    if let Some(verification) = &snapshot.verification {
        return View::Verification {
            steps: verification
                .steps
                .iter()
                .map(ChecklistRow::for_step)
                .collect(),
            japanese: verification.draft_japanese.clone(),
            english: verification.draft_english.clone(),
        };
    }

    View::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{SearchTopic, Verification, VerificationStep};

    fn topic(name: &str, completed: bool) -> SearchTopic {
        SearchTopic {
            topic: name.to_string(),
            completed,
        }
    }

    fn verification() -> Verification {
        Verification {
            steps: vec![VerificationStep {
                task: "Verifying the Haiku".to_string(),
                completed: false,
            }],
            draft_japanese: Vec::new(),
            draft_english: Vec::new(),
        }
    }

    #[test]
    fn classify_search_progress_row_per_topic() {
        let snapshot = AgentState {
            search_progress: Some(vec![topic("volcanoes", false)]),
            ..AgentState::default()
        };
        let view = classify_snapshot(&snapshot, &FlowState::default());
        let View::SearchProgress { rows } = view else {
            panic!("expected search progress, got {view:?}");
        };
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].completed);
        assert!(rows[0].label.contains("volcanoes"));
    }

    #[test]
    fn classify_accepted_flow_is_none_for_any_snapshot() {
        let flow = FlowState {
            accepted: true,
            ..FlowState::default()
        };
        let snapshots = [
            AgentState {
                search_progress: Some(vec![topic("a", true)]),
                ..AgentState::default()
            },
            AgentState {
                verification: Some(verification()),
                ..AgentState::default()
            },
            AgentState::default(),
        ];
        for snapshot in &snapshots {
            assert_eq!(classify_snapshot(snapshot, &flow), View::None);
        }
    }

    #[test]
    fn classify_prefers_search_progress_over_verification() {
        let snapshot = AgentState {
            search_progress: Some(vec![topic("a", false)]),
            verification: Some(verification()),
            current_node: None,
        };
        let view = classify_snapshot(&snapshot, &FlowState::default());
        assert!(matches!(view, View::SearchProgress { .. }));
    }

    #[test]
    fn classify_empty_search_progress_falls_through() {
        let snapshot = AgentState {
            search_progress: Some(Vec::new()),
            verification: Some(verification()),
            current_node: None,
        };
        let view = classify_snapshot(&snapshot, &FlowState::default());
        assert!(matches!(view, View::Verification { .. }));
    }

    #[test]
    fn classify_verification_with_empty_draft() {
        let snapshot = AgentState {
            verification: Some(verification()),
            ..AgentState::default()
        };
        let view = classify_snapshot(&snapshot, &FlowState::default());
        let View::Verification {
            steps,
            japanese,
            english,
        } = view
        else {
            panic!("expected verification, got {view:?}");
        };
        assert_eq!(steps[0].label, "Verifying the Haiku - in progress");
        assert!(japanese.is_empty());
        assert!(english.is_empty());
    }

    #[test]
    fn classify_empty_snapshot_is_none() {
        let view = classify_snapshot(&AgentState::default(), &FlowState::default());
        assert_eq!(view, View::None);
    }
}
