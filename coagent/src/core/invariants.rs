//! Snapshot invariants not expressible via JSON Schema.

use crate::core::types::AgentState;

/// Check semantic invariants of a decoded snapshot:
/// - At most one of search progress / verification is populated
/// - Search topics and verification tasks are non-blank
/// - Draft line counts agree once both drafts are non-empty
pub fn validate_snapshot(state: &AgentState) -> Vec<String> {
    let mut errors = Vec::new();

    if state.has_search_progress() && state.verification.is_some() {
        errors.push("searchProgress and verification are both populated".to_string());
    }

    if let Some(entries) = &state.search_progress {
        for (index, entry) in entries.iter().enumerate() {
            if entry.topic.trim().is_empty() {
                errors.push(format!("searchProgress[{index}]: topic must be non-empty"));
            }
        }
    }

    if let Some(verification) = &state.verification {
        for (index, step) in verification.steps.iter().enumerate() {
            if step.task.trim().is_empty() {
                errors.push(format!("verification.steps[{index}]: task must be non-empty"));
            }
        }
        let japanese = verification.draft_japanese.len();
        let english = verification.draft_english.len();
        if japanese > 0 && english > 0 && japanese != english {
            errors.push(format!(
                "verification: draftJapanese has {japanese} lines but draftEnglish has {english}"
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{SearchTopic, Verification, VerificationStep};

    #[test]
    fn valid_snapshot_has_no_errors() {
        let state = AgentState {
            search_progress: Some(vec![SearchTopic {
                topic: "volcanoes".to_string(),
                completed: false,
            }]),
            ..AgentState::default()
        };
        assert!(validate_snapshot(&state).is_empty());
    }

    #[test]
    fn reports_every_violation() {
        let state = AgentState {
            search_progress: Some(vec![SearchTopic {
                topic: " ".to_string(),
                completed: false,
            }]),
            verification: Some(Verification {
                steps: vec![VerificationStep {
                    task: String::new(),
                    completed: false,
                }],
                draft_japanese: vec!["a".to_string()],
                draft_english: vec!["A".to_string(), "B".to_string()],
            }),
            current_node: None,
        };
        let errors = validate_snapshot(&state);
        assert!(errors.iter().any(|err| err.contains("both populated")));
        assert!(errors.iter().any(|err| err.contains("searchProgress[0]")));
        assert!(errors.iter().any(|err| err.contains("steps[0]")));
        assert!(errors.iter().any(|err| err.contains("draftEnglish has 2")));
    }

    #[test]
    fn empty_search_progress_with_verification_is_fine() {
        let state = AgentState {
            search_progress: Some(Vec::new()),
            verification: Some(Verification::default()),
            current_node: None,
        };
        assert!(validate_snapshot(&state).is_empty());
    }
}
