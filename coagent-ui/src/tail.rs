//! Follow a JSONL event file and feed new events into the session.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use coagent::io::protocol::{AgentEvent, decode_event};
use coagent::session::SessionInput;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Read position in a growing JSONL file.
///
/// Only complete lines are decoded; a trailing partial line waits for the
/// next read. A file shorter than the offset was truncated and is re-read
/// from the start.
#[derive(Debug)]
pub struct EventTail {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl EventTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            partial: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode every complete line appended since the last read. Lines that
    /// fail to decode are logged and skipped.
    pub fn read_new(&mut self) -> Result<Vec<AgentEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut file =
            File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat {}", self.path.display()))?
            .len();
        if len < self.offset {
            info!(path = %self.path.display(), "event file truncated, reading from start");
            self.offset = 0;
            self.partial.clear();
        }
        file.seek(SeekFrom::Start(self.offset))
            .with_context(|| format!("seek {}", self.path.display()))?;
        let read = file
            .read_to_end(&mut self.partial)
            .with_context(|| format!("read {}", self.path.display()))?;
        self.offset += read as u64;

        let Some(last_newline) = self.partial.iter().rposition(|byte| *byte == b'\n') else {
            return Ok(Vec::new());
        };
        let bytes: Vec<u8> = self.partial.drain(..=last_newline).collect();
        let complete = String::from_utf8_lossy(&bytes);

        let mut events = Vec::new();
        for raw in complete.lines().filter(|line| !line.trim().is_empty()) {
            match decode_event(raw) {
                Ok(event) => events.push(event),
                Err(err) => warn!(error = ?err, "skipping undecodable event line"),
            }
        }
        Ok(events)
    }
}

/// Start tailing `path` in a background task.
pub fn start_event_tail(state: AppState, path: PathBuf) {
    tokio::spawn(async move {
        if let Err(e) = run_event_tail(state, path).await {
            warn!(error = %e, "event tail failed");
        }
    });
}

async fn run_event_tail(state: AppState, path: PathBuf) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(100)),
    )?;
    // Watch the directory so the file may be created after startup.
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watch {}", dir.display()))?;
    info!(path = %path.display(), "tailing agent events");

    let mut tail = EventTail::new(path);
    forward(&state, &mut tail).await?;

    while let Some(event) = rx.recv().await {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }
        forward(&state, &mut tail).await?;
    }
    Ok(())
}

async fn forward(state: &AppState, tail: &mut EventTail) -> Result<()> {
    let events = tail.read_new()?;
    if !events.is_empty() {
        debug!(path = %tail.path().display(), count = events.len(), "forwarding events");
    }
    for event in events {
        state.submit(SessionInput::Agent(event)).await?;
    }
    Ok(())
}
