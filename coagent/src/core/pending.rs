//! Human-in-the-loop prompt instances.
//!
//! Each blocking action instance is a two-state machine, `Pending` then
//! `Resolved`. Resolution is split into [`PendingAction::prepare`], which
//! decides whether a resolution may happen and what payload it sends, and
//! [`PendingAction::commit`], which records it. The caller sends the payload
//! in between, so a failed send leaves the instance pending.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::types::{Action, ActionStatus, Artifact};
use crate::core::view::{Outcome, PairedLine, PromptKind, PromptView};

/// How a prompt gets resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// The user clicks accept or reject.
    Manual,
    /// Resolved with the success literal once the configured delay elapses.
    Automatic,
}

/// A user decision on a manual prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

/// What asked for the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    User(Decision),
    Timer,
}

/// Literal payloads sent back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseLiterals {
    pub confirm_accepted: String,
    pub confirm_rejected: String,
    pub verify_accepted: String,
    pub verify_rejected: String,
    pub auto_success: String,
}

impl Default for ResponseLiterals {
    fn default() -> Self {
        Self {
            confirm_accepted: "Changes accepted".to_string(),
            confirm_rejected: "Changes rejected".to_string(),
            verify_accepted: "Verification accepted".to_string(),
            verify_rejected: "Verification rejected".to_string(),
            auto_success: "Verification complete".to_string(),
        }
    }
}

impl ResponseLiterals {
    pub fn payload(&self, kind: PromptKind, outcome: Outcome) -> &str {
        match (kind, outcome) {
            (_, Outcome::AutoCompleted) => &self.auto_success,
            (PromptKind::Confirm, Outcome::Accepted) => &self.confirm_accepted,
            (PromptKind::Confirm, Outcome::Rejected) => &self.confirm_rejected,
            (PromptKind::Verify, Outcome::Accepted) => &self.verify_accepted,
            (PromptKind::Verify, Outcome::Rejected) => &self.verify_rejected,
        }
    }
}

/// Why a resolution attempt did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    AlreadyResolved,
    /// The action is no longer `executing`.
    NotExecuting,
    /// Nobody is listening for a response to this action.
    NoResponseHandle,
    /// A user click on an automatic prompt, or a timer on a manual one.
    WrongTrigger,
}

/// A resolution that passed all checks and is ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedResolution {
    pub outcome: Outcome,
    pub payload: String,
}

/// A committed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub payload: String,
    /// Draft carried by the action when it was accepted, if complete.
    pub accepted_draft: Option<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptState {
    Pending,
    Resolved(Outcome),
}

/// One live blocking action instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    action: Action,
    kind: PromptKind,
    policy: ResolutionPolicy,
    rendered_at: Instant,
    state: PromptState,
}

impl PendingAction {
    pub fn new(action: Action, kind: PromptKind, policy: ResolutionPolicy, now: Instant) -> Self {
        Self {
            action,
            kind,
            policy,
            rendered_at: now,
            state: PromptState::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.action.id
    }

    pub fn name(&self) -> &str {
        &self.action.name
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub fn is_pending(&self) -> bool {
        self.state == PromptState::Pending
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            PromptState::Pending => None,
            PromptState::Resolved(outcome) => Some(outcome),
        }
    }

    /// Take newer arguments and status from a repeated emission.
    ///
    /// The resolution state is kept: a resolved instance stays resolved no
    /// matter how often the agent re-sends it. A resolved automatic instance
    /// keeps its `complete` status.
    pub fn refresh(&mut self, action: Action) {
        let keep_complete = self.outcome() == Some(Outcome::AutoCompleted);
        self.action = action;
        if keep_complete {
            self.action.status = ActionStatus::Complete;
        }
    }

    /// When the automatic resolution is due, for pending automatic instances.
    pub fn deadline(&self, delay: Duration) -> Option<Instant> {
        (self.policy == ResolutionPolicy::Automatic && self.is_pending())
            .then(|| self.rendered_at + delay)
    }

    /// Check whether `trigger` may resolve this instance now.
    ///
    /// `handle_available` reports whether a responder is attached and ready.
    /// Refusals leave the instance untouched.
    pub fn prepare(
        &self,
        trigger: Trigger,
        literals: &ResponseLiterals,
        handle_available: bool,
    ) -> Result<PreparedResolution, Refusal> {
        if !self.is_pending() {
            return Err(Refusal::AlreadyResolved);
        }
        let outcome = match (self.policy, trigger) {
            (ResolutionPolicy::Manual, Trigger::User(Decision::Accept)) => Outcome::Accepted,
            (ResolutionPolicy::Manual, Trigger::User(Decision::Reject)) => Outcome::Rejected,
            (ResolutionPolicy::Automatic, Trigger::Timer) => Outcome::AutoCompleted,
            _ => return Err(Refusal::WrongTrigger),
        };
        if self.action.status != ActionStatus::Executing {
            return Err(Refusal::NotExecuting);
        }
        if !handle_available || !self.action.requires_response {
            return Err(Refusal::NoResponseHandle);
        }
        Ok(PreparedResolution {
            outcome,
            payload: literals.payload(self.kind, outcome).to_string(),
        })
    }

    /// Record a prepared resolution. Returns `None` if the instance was
    /// already resolved.
    pub fn commit(&mut self, prepared: PreparedResolution) -> Option<Resolution> {
        if !self.is_pending() {
            return None;
        }
        self.state = PromptState::Resolved(prepared.outcome);
        if prepared.outcome == Outcome::AutoCompleted {
            self.action.status = ActionStatus::Complete;
        }
        let accepted_draft = match prepared.outcome {
            Outcome::Accepted | Outcome::AutoCompleted => self.action.arguments.complete_artifact(),
            Outcome::Rejected => None,
        };
        Some(Resolution {
            outcome: prepared.outcome,
            payload: prepared.payload,
            accepted_draft,
        })
    }

    /// Describe the prompt for rendering.
    pub fn view(&self, handle_available: bool) -> PromptView {
        let args = &self.action.arguments;
        let japanese = args.japanese.clone().unwrap_or_default();
        let english = args.english.clone().unwrap_or_default();
        let lines = japanese
            .into_iter()
            .enumerate()
            .map(|(index, line)| PairedLine {
                japanese: line,
                english: english.get(index).cloned(),
            })
            .collect();
        let outcome = self.outcome();
        PromptView {
            action_id: self.action.id.clone(),
            action_name: self.action.name.clone(),
            kind: self.kind,
            automatic: self.policy == ResolutionPolicy::Automatic,
            lines,
            controls_enabled: self.policy == ResolutionPolicy::Manual
                && self.is_pending()
                && self.action.status == ActionStatus::Executing
                && self.action.requires_response
                && handle_available,
            outcome,
            outcome_text: outcome.map(|outcome| outcome.display().to_string()),
        }
    }
}
