//! Shared application state for the UI server.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use coagent::core::view::RenderedPage;
use coagent::io::config::CoagentConfig;
use coagent::io::protocol::ActionResponse;
use coagent::io::responder::Responder;
use coagent::reconcile::Reconciler;
use coagent::session::{SessionInput, run_session};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Responder that fans responses out to `/agent/responses` subscribers.
///
/// Available only while at least one subscriber is connected, so prompts
/// cannot resolve when nobody would receive the response.
pub struct BroadcastResponder {
    tx: broadcast::Sender<ActionResponse>,
}

impl BroadcastResponder {
    pub fn new(tx: broadcast::Sender<ActionResponse>) -> Self {
        Self { tx }
    }
}

impl Responder for BroadcastResponder {
    fn is_available(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    fn respond(&mut self, response: &ActionResponse) -> Result<()> {
        let receivers = self
            .tx
            .send(response.clone())
            .map_err(|_| anyhow!("no response subscribers"))?;
        debug!(receivers, action_id = %response.action_id, "response broadcast");
        Ok(())
    }
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CoagentConfig>,
    /// Inputs to the session task.
    pub inputs: mpsc::Sender<SessionInput>,
    /// Latest rendered page; changes only when the page does.
    pub page: watch::Receiver<RenderedPage>,
    /// Outbound responses for the agent backend.
    pub responses: Arc<broadcast::Sender<ActionResponse>>,
}

impl AppState {
    /// Spawn the session task and return the state that talks to it.
    pub fn start(config: CoagentConfig) -> (Self, JoinHandle<Reconciler>) {
        let (responses, _) = broadcast::channel(64);
        let mut reconciler = Reconciler::new(config.clone());
        reconciler.attach_responder(Box::new(BroadcastResponder::new(responses.clone())));

        let (page_tx, page) = watch::channel(reconciler.page().clone());
        let (inputs, rx) = mpsc::channel(256);
        let task = tokio::spawn(run_session(reconciler, rx, move |_, rendered| {
            page_tx.send_if_modified(|current| {
                if current == rendered {
                    return false;
                }
                *current = rendered.clone();
                true
            });
        }));

        let state = Self {
            config: Arc::new(config),
            inputs,
            page,
            responses: Arc::new(responses),
        };
        (state, task)
    }

    /// Queue an input for the session. Fails once the session has stopped.
    pub async fn submit(&self, input: SessionInput) -> Result<()> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| anyhow!("session stopped"))
    }
}
