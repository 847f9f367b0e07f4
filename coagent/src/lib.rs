//! Live state reconciliation and action rendering for an agent chat UI.
//!
//! Agent state snapshots and action invocations stream in; the crate decides
//! what to show (search progress, a verification checklist, artifact cards,
//! a confirmation prompt, or nothing) and sends at most one response per
//! blocking action back to the agent.
//!
//! - **[`core`]**: Pure, deterministic logic (classification, flow state,
//!   artifact store, prompt state machine). No I/O.
//! - **[`io`]**: Config, wire format, event logs, outbound responders.
//!
//! [`reconcile`] combines the two into a [`reconcile::Reconciler`];
//! [`session`] drives one asynchronously with timers, and [`replay`] /
//! [`validate`] implement the CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod reconcile;
pub mod replay;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
