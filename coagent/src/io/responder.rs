//! Outbound delivery of action responses.
//!
//! The [`Responder`] trait decouples the reconciler from how responses reach
//! the agent backend. Tests use a recording responder.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::io::protocol::ActionResponse;

/// Sink for responses to blocking actions.
pub trait Responder: Send {
    /// Whether a response can be delivered right now. When `false`, the
    /// reconciler treats resolution attempts as having no response handle.
    fn is_available(&self) -> bool {
        true
    }

    /// Deliver one response. Called at most once per action instance.
    fn respond(&mut self, response: &ActionResponse) -> Result<()>;
}

/// Responder that forwards responses into a tokio channel.
pub struct ChannelResponder {
    tx: mpsc::UnboundedSender<ActionResponse>,
}

impl ChannelResponder {
    pub fn new(tx: mpsc::UnboundedSender<ActionResponse>) -> Self {
        Self { tx }
    }
}

impl Responder for ChannelResponder {
    fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }

    fn respond(&mut self, response: &ActionResponse) -> Result<()> {
        self.tx
            .send(response.clone())
            .map_err(|_| anyhow::anyhow!("response channel closed"))
    }
}

/// Responder that writes each response as a JSON line.
pub struct JsonlResponder<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonlResponder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Responder for JsonlResponder<W> {
    fn respond(&mut self, response: &ActionResponse) -> Result<()> {
        let line = serde_json::to_string(&serde_json::json!({ "response": response }))
            .context("serialize response")?;
        debug!(action_id = %response.action_id, "writing response line");
        writeln!(self.out, "{line}").context("write response")?;
        self.out.flush().context("flush response")
    }
}
