//! Orchestration for `coagent replay`: drive a session over a recorded log.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::core::pending::ResolutionPolicy;
use crate::core::view::{RenderedPage, View};
use crate::io::config::CoagentConfig;
use crate::io::protocol::{ActionResponse, AgentEvent};
use crate::io::responder::ChannelResponder;
use crate::reconcile::Reconciler;
use crate::session::{SessionInput, apply_input, drain_timers};

/// Summary of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub events: usize,
    pub views: usize,
    pub responses: usize,
    pub page: RenderedPage,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum ReplayLine<'a> {
    View(&'a View),
    Response(&'a ActionResponse),
    Page(&'a RenderedPage),
}

fn write_line<W: Write>(out: &mut W, line: &ReplayLine<'_>) -> Result<()> {
    let json = serde_json::to_string(line).context("serialize replay line")?;
    writeln!(out, "{json}").context("write replay line")
}

/// Force every prompt onto `policy`.
pub fn with_policy(mut config: CoagentConfig, policy: ResolutionPolicy) -> CoagentConfig {
    config.actions.default_policy = policy;
    for spec in &mut config.actions.prompts {
        spec.policy = Some(policy);
    }
    config
}

/// Replay `events` in order, writing one JSON line per view and per outbound
/// response, then the final page. Outstanding automatic resolutions are
/// waited for before the page is written.
pub async fn replay<W: Write>(
    events: Vec<AgentEvent>,
    config: CoagentConfig,
    out: &mut W,
) -> Result<ReplayOutcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut reconciler = Reconciler::new(config);
    reconciler.attach_responder(Box::new(ChannelResponder::new(tx)));

    let total = events.len();
    let mut views = Vec::with_capacity(total);
    for event in events {
        views.push(apply_input(&mut reconciler, SessionInput::Agent(event)));
    }
    drain_timers(&mut reconciler, |view, _| views.push(view.clone())).await;

    for view in &views {
        write_line(out, &ReplayLine::View(view))?;
    }
    let mut responses = 0;
    while let Ok(response) = rx.try_recv() {
        write_line(out, &ReplayLine::Response(&response))?;
        responses += 1;
    }
    let page = reconciler.page().clone();
    write_line(out, &ReplayLine::Page(&page))?;

    info!(events = total, views = views.len(), responses, "replay finished");
    Ok(ReplayOutcome {
        events: total,
        views: views.len(),
        responses,
        page,
    })
}
