//! I/O helpers for the live view: configuration, wire format, event logs and
//! outbound responders.

pub mod config;
pub mod event_log;
pub mod protocol;
pub mod responder;
