//! The reconciliation layer: turns agent events and user decisions into views.
//!
//! A [`Reconciler`] owns all per-session state (latest snapshot, flow state,
//! artifact store, prompt instances, automatic-resolution schedule). It is
//! driven by exactly one owner, so every mutation happens through `&mut self`
//! and no locking is needed.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::core::artifact_store::{ArtifactStore, Upsert};
use crate::core::classifier::classify_snapshot;
use crate::core::pending::{Decision, PendingAction, ResolutionPolicy, Trigger};
use crate::core::state_update::{FlowEffect, FlowEvent, FlowState, apply_flow_event};
use crate::core::types::{Action, ActionStatus, AgentState, Artifact};
use crate::core::view::{ArtifactCard, PromptKind, RenderedPage, View};
use crate::io::config::CoagentConfig;
use crate::io::protocol::{ActionResponse, AgentEvent};
use crate::io::responder::Responder;

#[derive(Debug)]
struct PromptSlot {
    prompt: PendingAction,
    /// The prompt's component is on the page. Torn-down prompts keep their
    /// resolution state so a re-mount cannot resolve them again.
    mounted: bool,
}

/// Live view state for one session.
pub struct Reconciler {
    config: CoagentConfig,
    snapshot: AgentState,
    flow: FlowState,
    store: ArtifactStore,
    /// Last render action arrived without a complete artifact.
    render_pending: bool,
    prompts: Vec<PromptSlot>,
    /// Automatic-resolution deadlines by action id. Removing an entry is the
    /// only way to cancel a timer.
    schedule: BTreeMap<String, Instant>,
    /// Automatic resolutions that came due while no response could be
    /// delivered. Moved back into `schedule` once a responder is available.
    parked: BTreeMap<String, Instant>,
    responder: Option<Box<dyn Responder>>,
    page: RenderedPage,
}

impl Reconciler {
    pub fn new(config: CoagentConfig) -> Self {
        Self {
            config,
            snapshot: AgentState::default(),
            flow: FlowState::default(),
            store: ArtifactStore::new(),
            render_pending: false,
            prompts: Vec::new(),
            schedule: BTreeMap::new(),
            parked: BTreeMap::new(),
            responder: None,
            page: RenderedPage::default(),
        }
    }

    pub fn config(&self) -> &CoagentConfig {
        &self.config
    }

    pub fn page(&self) -> &RenderedPage {
        &self.page
    }

    pub fn flow(&self) -> &FlowState {
        &self.flow
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.store
    }

    /// Install the sink that receives responses to blocking actions.
    pub fn attach_responder(&mut self, responder: Box<dyn Responder>) {
        self.responder = Some(responder);
        self.rearm_parked();
        self.rebuild_page();
    }

    /// Remove the responder. Later resolution attempts become no-ops.
    pub fn detach_responder(&mut self) -> Option<Box<dyn Responder>> {
        let responder = self.responder.take();
        self.rebuild_page();
        responder
    }

    /// Re-derive the page, e.g. after the responder's availability changed.
    pub fn refresh(&mut self) -> &RenderedPage {
        self.rearm_parked();
        self.rebuild_page();
        &self.page
    }

    /// Earliest pending automatic resolution.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.values().min().copied()
    }

    /// Any blocking prompt still waiting for a response.
    pub fn has_pending_prompt(&self) -> bool {
        self.prompts.iter().any(|slot| slot.prompt.is_pending())
    }

    /// A pending prompt that can still be resolved: on the page, executing
    /// and expecting a response. Only these defer a new flow.
    pub fn has_blocking_prompt(&self) -> bool {
        self.prompts.iter().any(|slot| {
            let action = slot.prompt.action();
            slot.mounted
                && slot.prompt.is_pending()
                && action.status == ActionStatus::Executing
                && action.requires_response
        })
    }

    /// Process one inbound agent event and return the view it produced.
    #[instrument(skip_all)]
    pub fn handle_event(&mut self, event: AgentEvent, now: Instant) -> View {
        let view = match event {
            AgentEvent::StateSnapshot {
                agent_name,
                node_name,
                snapshot,
            } => {
                if let Some(name) = agent_name.as_deref()
                    && name != self.config.agent.name
                {
                    debug!(agent = name, "ignoring snapshot for another agent");
                    return View::None;
                }
                let state = AgentEvent::agent_state(&snapshot, node_name.as_deref());
                self.apply_snapshot(state)
            }
            AgentEvent::Action {
                id,
                name,
                status,
                arguments,
                requires_response,
            } => {
                let action =
                    AgentEvent::action(id.as_deref(), &name, status, &arguments, requires_response);
                self.apply_action(action, now)
            }
            AgentEvent::TextMessage { role, .. } => {
                debug!(?role, "chat message");
                View::None
            }
            AgentEvent::ActionTeardown { id } => {
                self.teardown(&id);
                return View::None;
            }
        };
        self.page.welcome = false;
        self.rebuild_page();
        view
    }

    /// Apply a user decision to a manual prompt.
    ///
    /// Returns the prompt's view after the attempt. Refused attempts (already
    /// resolved, not executing, no response handle) change nothing.
    #[instrument(skip(self))]
    pub fn decide(&mut self, action_id: &str, decision: Decision) -> View {
        let mounted = self
            .prompts
            .iter()
            .any(|slot| slot.mounted && slot.prompt.id() == action_id);
        if !mounted {
            debug!("decision for unknown or unmounted prompt");
            return View::None;
        }
        let view = self.resolve(action_id, Trigger::User(decision));
        self.rebuild_page();
        view
    }

    /// Cancel the timer of an action whose component went away.
    #[instrument(skip(self))]
    pub fn teardown(&mut self, action_id: &str) {
        let scheduled = self.schedule.remove(action_id).is_some();
        if self.parked.remove(action_id).is_some() || scheduled {
            debug!("automatic resolution cancelled");
        }
        if let Some(slot) = self
            .prompts
            .iter_mut()
            .find(|slot| slot.prompt.id() == action_id)
        {
            slot.mounted = false;
        }
        self.rebuild_page();
    }

    /// Resolve every automatic prompt whose deadline is at or before `now`.
    pub fn fire_due(&mut self, now: Instant) -> Vec<View> {
        let due: Vec<String> = self
            .schedule
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        let mut views = Vec::with_capacity(due.len());
        for id in due {
            if let Some(deadline) = self.schedule.remove(&id) {
                let view = self.resolve(&id, Trigger::Timer);
                if self.awaits_responder(&id) {
                    debug!(action_id = %id, "no response handle, automatic resolution parked");
                    self.parked.insert(id, deadline);
                }
                views.push(view);
            }
        }
        if !views.is_empty() {
            self.rebuild_page();
        }
        views
    }

    fn apply_snapshot(&mut self, state: AgentState) -> View {
        let update = apply_flow_event(
            &self.flow,
            FlowEvent::StageObserved {
                stage: state.current_node.as_deref(),
                pending_blocking: self.has_blocking_prompt(),
            },
            &self.config.agent.start_stage,
        );
        self.flow = update.next;
        if update.effect == FlowEffect::NewFlow {
            self.start_flow();
        }
        self.snapshot = state;
        classify_snapshot(&self.snapshot, &self.flow)
    }

    /// Clear per-flow bookkeeping: resolved prompts of the previous flow.
    fn start_flow(&mut self) {
        let before = self.prompts.len();
        self.prompts.retain(|slot| slot.prompt.is_pending());
        self.render_pending = false;
        info!(
            flow = self.flow.flows_started,
            cleared = before - self.prompts.len(),
            "new flow started"
        );
    }

    fn apply_action(&mut self, action: Action, now: Instant) -> View {
        if action.name == self.config.actions.render_action {
            return self.render_artifact(&action);
        }
        let prompt = self.config.actions.prompt_for(&action.name).or_else(|| {
            action
                .requires_response
                .then_some((PromptKind::Confirm, self.config.actions.default_policy))
        });
        match prompt {
            Some((kind, policy)) => self.render_prompt(action, kind, policy, now),
            None => {
                debug!(name = %action.name, "no renderer for action");
                View::None
            }
        }
    }

    fn render_artifact(&mut self, action: &Action) -> View {
        let mut cards = match action.arguments.complete_artifact() {
            Some(artifact) => {
                self.render_pending = false;
                self.accept_artifact(artifact, false);
                self.store.cards()
            }
            None => {
                debug!(id = %action.id, "render arguments incomplete");
                self.render_pending = true;
                self.store.cards()
            }
        };
        if self.render_pending {
            cards.push(ArtifactCard::placeholder());
        }
        View::ArtifactCards { cards }
    }

    fn render_prompt(
        &mut self,
        action: Action,
        kind: PromptKind,
        policy: ResolutionPolicy,
        now: Instant,
    ) -> View {
        let delay = self.config.actions.auto_resolve_delay();
        let id = action.id.clone();

        if let Some(slot) = self
            .prompts
            .iter_mut()
            .find(|slot| slot.prompt.id() == id)
        {
            slot.prompt.refresh(action);
            if !slot.mounted {
                slot.mounted = true;
                // A re-mounted automatic prompt starts a fresh delay.
                if slot.prompt.deadline(delay).is_some() {
                    self.schedule.insert(id.clone(), now + delay);
                }
            }
        } else {
            self.replace_pending(&action.name);
            let prompt = PendingAction::new(action, kind, policy, now);
            if let Some(deadline) = prompt.deadline(delay) {
                debug!(id = %id, delay_ms = delay.as_millis(), "automatic resolution scheduled");
                self.schedule.insert(id.clone(), deadline);
            }
            self.prompts.push(PromptSlot {
                prompt,
                mounted: true,
            });
        }
        self.prompt_view(&id)
    }

    /// A new instance of an action supersedes its older pending instances.
    fn replace_pending(&mut self, name: &str) {
        let replaced: Vec<String> = self
            .prompts
            .iter()
            .filter(|slot| slot.prompt.name() == name && slot.prompt.is_pending())
            .map(|slot| slot.prompt.id().to_string())
            .collect();
        for id in &replaced {
            debug!(id = %id, "prompt replaced by newer instance");
            self.schedule.remove(id);
            self.parked.remove(id);
        }
        self.prompts
            .retain(|slot| !replaced.iter().any(|id| id == slot.prompt.id()));
    }

    fn resolve(&mut self, action_id: &str, trigger: Trigger) -> View {
        let handle = self.handle_available();
        let Some(index) = self
            .prompts
            .iter()
            .position(|slot| slot.prompt.id() == action_id)
        else {
            return View::None;
        };

        let prepared = match self.prompts[index].prompt.prepare(
            trigger,
            &self.config.messages,
            handle,
        ) {
            Ok(prepared) => prepared,
            Err(refusal) => {
                debug!(action_id, ?refusal, "resolution refused");
                return self.prompt_view(action_id);
            }
        };

        let response = ActionResponse {
            action_id: action_id.to_string(),
            action_name: self.prompts[index].prompt.name().to_string(),
            payload: prepared.payload.clone(),
        };
        let Some(responder) = self.responder.as_mut() else {
            return self.prompt_view(action_id);
        };
        if let Err(err) = responder.respond(&response) {
            warn!(action_id, error = %err, "failed to deliver response, prompt stays pending");
            return self.prompt_view(action_id);
        }

        if let Some(resolution) = self.prompts[index].prompt.commit(prepared) {
            info!(action_id, outcome = ?resolution.outcome, "prompt resolved");
            if let Some(draft) = resolution.accepted_draft {
                self.accept_artifact(draft, true);
            }
        }
        self.prompt_view(action_id)
    }

    /// Store an accepted artifact and set the acceptance flag.
    ///
    /// Render actions re-fire for artifacts that are already on the page, so
    /// `explicit == false` only sets the flag for artifacts not seen before.
    /// Explicit acceptances (user or timer) always set it.
    fn accept_artifact(&mut self, artifact: Artifact, explicit: bool) {
        let upsert = self.store.upsert(artifact);
        debug!(?upsert, "artifact stored");
        if !explicit && matches!(upsert, Upsert::Replaced { .. }) {
            return;
        }
        let update = apply_flow_event(
            &self.flow,
            FlowEvent::ArtifactAccepted,
            &self.config.agent.start_stage,
        );
        self.flow = update.next;
        if update.effect == FlowEffect::Accepted {
            info!(acceptances = self.flow.acceptances, "artifact accepted");
        }
    }

    /// The timer fired but the only thing missing was a way to respond.
    fn awaits_responder(&self, action_id: &str) -> bool {
        self.prompts.iter().any(|slot| {
            slot.mounted
                && slot.prompt.id() == action_id
                && slot
                    .prompt
                    .prepare(Trigger::Timer, &self.config.messages, true)
                    .is_ok()
        })
    }

    /// Give parked automatic resolutions another chance. Their deadlines
    /// have passed, so they fire on the next `fire_due`.
    fn rearm_parked(&mut self) {
        if self.parked.is_empty() || !self.handle_available() {
            return;
        }
        info!(count = self.parked.len(), "re-arming parked automatic resolutions");
        self.schedule.append(&mut self.parked);
    }

    fn handle_available(&self) -> bool {
        self.responder
            .as_ref()
            .is_some_and(|responder| responder.is_available())
    }

    fn prompt_view(&self, action_id: &str) -> View {
        let handle = self.handle_available();
        self.prompts
            .iter()
            .find(|slot| slot.prompt.id() == action_id)
            .map(|slot| View::ConfirmationPrompt(slot.prompt.view(handle)))
            .unwrap_or(View::None)
    }

    fn rebuild_page(&mut self) {
        let handle = self.handle_available();
        let mut cards = self.store.cards();
        if self.render_pending {
            cards.push(ArtifactCard::placeholder());
        }
        self.page.state_view = classify_snapshot(&self.snapshot, &self.flow);
        self.page.cards = cards;
        self.page.prompts = self
            .prompts
            .iter()
            .filter(|slot| slot.mounted)
            .map(|slot| slot.prompt.view(handle))
            .collect();
    }
}
