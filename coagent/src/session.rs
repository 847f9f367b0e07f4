//! Async driver for a [`Reconciler`].
//!
//! One task owns the reconciler and serializes every input: agent events,
//! user decisions, teardowns and timer expiries. Automatic resolutions are
//! not spawned tasks; the loop sleeps until the reconciler's next deadline,
//! so cancelling a timer is just removing its deadline.

use std::future;
use std::time::Instant as StdInstant;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::core::pending::Decision;
use crate::core::view::{RenderedPage, View};
use crate::io::protocol::AgentEvent;
use crate::reconcile::Reconciler;

/// Input to a running session.
#[derive(Debug, Clone)]
pub enum SessionInput {
    Agent(AgentEvent),
    Decide {
        action_id: String,
        decision: Decision,
    },
    Teardown {
        action_id: String,
    },
    /// Re-derive the page without new input (e.g. a responder connected).
    Refresh,
}

fn now() -> StdInstant {
    Instant::now().into_std()
}

/// Apply one input and return the view it produced.
pub fn apply_input(reconciler: &mut Reconciler, input: SessionInput) -> View {
    match input {
        SessionInput::Agent(event) => reconciler.handle_event(event, now()),
        SessionInput::Decide {
            action_id,
            decision,
        } => reconciler.decide(&action_id, decision),
        SessionInput::Teardown { action_id } => {
            reconciler.teardown(&action_id);
            View::None
        }
        SessionInput::Refresh => {
            reconciler.refresh();
            View::None
        }
    }
}

async fn sleep_until_deadline(deadline: Option<StdInstant>) {
    match deadline {
        Some(deadline) => sleep_until(Instant::from_std(deadline)).await,
        None => future::pending().await,
    }
}

/// Run until `inputs` closes, reporting every produced view with the page
/// it left behind. Returns the reconciler for inspection or draining.
pub async fn run_session<F>(
    mut reconciler: Reconciler,
    mut inputs: mpsc::Receiver<SessionInput>,
    mut on_update: F,
) -> Reconciler
where
    F: FnMut(&View, &RenderedPage),
{
    info!("session started");
    loop {
        let deadline = reconciler.next_deadline();
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else {
                    break;
                };
                let view = apply_input(&mut reconciler, input);
                on_update(&view, reconciler.page());
            }
            _ = sleep_until_deadline(deadline) => {
                for view in reconciler.fire_due(now()) {
                    on_update(&view, reconciler.page());
                }
            }
        }
    }
    info!("session inputs closed");
    reconciler
}

/// Wait for every scheduled automatic resolution to fire.
pub async fn drain_timers<F>(reconciler: &mut Reconciler, mut on_update: F)
where
    F: FnMut(&View, &RenderedPage),
{
    while let Some(deadline) = reconciler.next_deadline() {
        debug!("waiting for scheduled resolution");
        sleep_until(Instant::from_std(deadline)).await;
        for view in reconciler.fire_due(now()) {
            on_update(&view, reconciler.page());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pending::ResolutionPolicy;
    use crate::core::view::Outcome;
    use crate::io::config::CoagentConfig;
    use crate::test_support::{RecordingResponder, action_event, haiku_args};
    use std::time::Duration;

    fn automatic_reconciler(responder: &RecordingResponder) -> Reconciler {
        let mut cfg = CoagentConfig::default();
        cfg.actions.default_policy = ResolutionPolicy::Automatic;
        let mut reconciler = Reconciler::new(cfg);
        reconciler.attach_responder(Box::new(responder.clone()));
        reconciler
    }

    fn verify_event(id: &str) -> SessionInput {
        SessionInput::Agent(action_event(
            id,
            "verify_haiku",
            "executing",
            haiku_args(),
            true,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn automatic_prompt_resolves_after_delay() {
        let responder = RecordingResponder::new();
        let (tx, rx) = mpsc::channel(8);
        let (views_tx, mut views_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(
            automatic_reconciler(&responder),
            rx,
            move |view, _| {
                let _ = views_tx.send(view.clone());
            },
        ));

        tx.send(verify_event("call-1")).await.expect("send");
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(responder.responses().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let sent = responder.responses();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload, "Verification complete");

        drop(tx);
        let reconciler = handle.await.expect("join");
        assert!(reconciler.flow().accepted);

        let mut outcomes = Vec::new();
        while let Ok(view) = views_rx.try_recv() {
            if let View::ConfirmationPrompt(prompt) = view {
                outcomes.push(prompt.outcome);
            }
        }
        assert_eq!(outcomes, vec![None, Some(Outcome::AutoCompleted)]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_before_deadline_sends_nothing() {
        let responder = RecordingResponder::new();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(run_session(
            automatic_reconciler(&responder),
            rx,
            |_, _| {},
        ));

        tx.send(verify_event("call-1")).await.expect("send");
        tokio::time::sleep(Duration::from_millis(1000)).await;
        tx.send(SessionInput::Teardown {
            action_id: "call-1".to_string(),
        })
        .await
        .expect("send");
        tokio::time::sleep(Duration::from_secs(10)).await;

        drop(tx);
        let reconciler = handle.await.expect("join");
        assert!(responder.responses().is_empty());
        assert_eq!(reconciler.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_fires_outstanding_timers() {
        let responder = RecordingResponder::new();
        let mut reconciler = automatic_reconciler(&responder);
        apply_input(&mut reconciler, verify_event("call-1"));
        let mut fired = 0;
        drain_timers(&mut reconciler, |_, _| fired += 1).await;
        assert_eq!(fired, 1);
        assert_eq!(responder.responses().len(), 1);
    }
}
