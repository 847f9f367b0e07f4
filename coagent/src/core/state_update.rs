//! Per-flow session state and its transition function.
//!
//! The acceptance flag and the current stage live in an immutable
//! [`FlowState`] value. The reconciler replaces its copy with the `next` value
//! returned by [`apply_flow_event`]; nothing else mutates it.

use crate::core::stage_tracker::{StageChange, observe_stage};

/// Flow-level state shared by the classifier and the action renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowState {
    /// An artifact has been accepted in the current flow. While set, the
    /// progress and verification views stay hidden.
    pub accepted: bool,
    /// Last stage reported by the backend.
    pub stage: Option<String>,
    /// Number of flows started in this session.
    pub flows_started: u32,
    /// Number of times `accepted` went from `false` to `true`.
    pub acceptances: u32,
}

/// Input to [`apply_flow_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent<'a> {
    /// A snapshot reported the active stage.
    StageObserved {
        stage: Option<&'a str>,
        /// Some blocking action is still waiting for a response.
        pending_blocking: bool,
    },
    /// An artifact was accepted (rendered final, or approved by the user).
    ArtifactAccepted,
}

/// Side effect the reconciler must carry out for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEffect {
    None,
    /// A new flow began: per-flow bookkeeping must be cleared.
    NewFlow,
    /// The acceptance flag was just set.
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowUpdate {
    pub next: FlowState,
    pub effect: FlowEffect,
}

/// Compute the next flow state.
///
/// - Entering `start_stage` from another stage starts a new flow and clears the
///   acceptance flag, unless a blocking action is still pending.
/// - Accepting an artifact sets the flag once; later acceptances in the same
///   flow are no-ops.
pub fn apply_flow_event(
    prev: &FlowState,
    event: FlowEvent<'_>,
    start_stage: &str,
) -> FlowUpdate {
    let mut next = prev.clone();
    let effect = match event {
        FlowEvent::StageObserved {
            stage,
            pending_blocking,
        } => {
            let change = observe_stage(prev.stage.as_deref(), stage, start_stage);
            if let Some(stage) = stage {
                next.stage = Some(stage.to_string());
            }
            match change {
                StageChange::FlowStart if !pending_blocking => {
                    next.accepted = false;
                    next.flows_started += 1;
                    FlowEffect::NewFlow
                }
                _ => FlowEffect::None,
            }
        }
        FlowEvent::ArtifactAccepted => {
            if prev.accepted {
                FlowEffect::None
            } else {
                next.accepted = true;
                next.acceptances += 1;
                FlowEffect::Accepted
            }
        }
    };
    FlowUpdate { next, effect }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "start_flow";

    fn observe<'a>(stage: &'a str, pending_blocking: bool) -> FlowEvent<'a> {
        FlowEvent::StageObserved {
            stage: Some(stage),
            pending_blocking,
        }
    }

    #[test]
    fn acceptance_is_set_exactly_once() {
        let first = apply_flow_event(&FlowState::default(), FlowEvent::ArtifactAccepted, START);
        assert_eq!(first.effect, FlowEffect::Accepted);
        assert!(first.next.accepted);
        assert_eq!(first.next.acceptances, 1);

        let second = apply_flow_event(&first.next, FlowEvent::ArtifactAccepted, START);
        assert_eq!(second.effect, FlowEffect::None);
        assert_eq!(second.next, first.next);
    }

    #[test]
    fn returning_to_start_stage_resets_acceptance() {
        let state = FlowState {
            accepted: true,
            stage: Some("render_haiku_node".to_string()),
            flows_started: 1,
            acceptances: 1,
        };
        let update = apply_flow_event(&state, observe(START, false), START);
        assert_eq!(update.effect, FlowEffect::NewFlow);
        assert!(!update.next.accepted);
        assert_eq!(update.next.flows_started, 2);
        assert_eq!(update.next.stage.as_deref(), Some(START));
    }

    #[test]
    fn pending_blocking_action_defers_reset() {
        let state = FlowState {
            accepted: true,
            stage: Some("render_haiku_node".to_string()),
            flows_started: 1,
            acceptances: 1,
        };
        let update = apply_flow_event(&state, observe(START, true), START);
        assert_eq!(update.effect, FlowEffect::None);
        assert!(update.next.accepted);
        // Stage is still tracked so the same stage is not re-detected later.
        assert_eq!(update.next.stage.as_deref(), Some(START));
    }

    #[test]
    fn observing_same_stage_is_idempotent() {
        let once = apply_flow_event(&FlowState::default(), observe(START, false), START);
        let twice = apply_flow_event(&once.next, observe(START, false), START);
        assert_eq!(twice.effect, FlowEffect::None);
        assert_eq!(twice.next, once.next);
    }

    #[test]
    fn missing_stage_keeps_previous_stage() {
        let state = FlowState {
            stage: Some("search_node".to_string()),
            ..FlowState::default()
        };
        let update = apply_flow_event(
            &state,
            FlowEvent::StageObserved {
                stage: None,
                pending_blocking: false,
            },
            START,
        );
        assert_eq!(update.next, state);
    }
}
