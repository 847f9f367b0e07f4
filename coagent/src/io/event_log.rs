//! Recorded agent event streams (one JSON event per line).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::protocol::{AgentEvent, decode_event};

/// One non-blank line of an event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    /// 1-indexed line number in the file.
    pub line: usize,
    pub raw: String,
}

/// Read the non-blank lines of a JSONL event log.
pub fn read_event_lines(path: &Path) -> Result<Vec<EventLine>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read event log {}", path.display()))?;
    let lines = split_event_lines(&contents);
    debug!(path = %path.display(), events = lines.len(), "event log read");
    Ok(lines)
}

/// Split JSONL text into non-blank lines, keeping their line numbers.
pub fn split_event_lines(contents: &str) -> Vec<EventLine> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(index, raw)| EventLine {
            line: index + 1,
            raw: raw.to_string(),
        })
        .collect()
}

/// Read and decode every event of a JSONL event log.
///
/// Fails on the first line that does not decode, naming its line number.
pub fn load_events(path: &Path) -> Result<Vec<AgentEvent>> {
    read_event_lines(path)?
        .iter()
        .map(|line| {
            decode_event(&line.raw)
                .with_context(|| format!("{}:{}", path.display(), line.line))
        })
        .collect()
}
