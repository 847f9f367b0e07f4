//! Server-Sent Events streams for browsers and the agent backend.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use coagent::session::SessionInput;
use futures::stream::Stream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::state::AppState;

fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(Duration::from_secs(15)).text("ping")
}

/// GET /events - the current page, then every page change.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut page = state.page.clone();

    let stream = async_stream::stream! {
        let initial = page.borrow_and_update().clone();
        if let Ok(json) = serde_json::to_string(&initial) {
            yield Ok(Event::default().event("page").data(json));
        }

        while page.changed().await.is_ok() {
            let current = page.borrow_and_update().clone();
            match serde_json::to_string(&current) {
                Ok(json) => yield Ok(Event::default().event("page").data(json)),
                Err(err) => warn!(error = %err, "failed to serialize page"),
            }
        }
    };

    Sse::new(stream).keep_alive(keep_alive())
}

/// Asks the session to re-derive the page when dropped, so prompt controls
/// follow the number of connected response subscribers.
struct RefreshOnDrop(mpsc::Sender<SessionInput>);

impl Drop for RefreshOnDrop {
    fn drop(&mut self) {
        queue_refresh(&self.0);
    }
}

/// Queue a page refresh without waiting. Returns `false` if it was dropped.
fn queue_refresh(inputs: &mpsc::Sender<SessionInput>) -> bool {
    match inputs.try_send(SessionInput::Refresh) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to queue page refresh, prompt controls may be stale");
            false
        }
    }
}

/// GET /agent/responses - outbound responses for the agent backend.
pub async fn responses_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let refresh = RefreshOnDrop(state.inputs.clone());
    let rx = state.responses.subscribe();
    if state.submit(SessionInput::Refresh).await.is_err() {
        warn!("session stopped, response stream will stay empty");
    }

    let stream = async_stream::stream! {
        // Dropped after `rx`, so the refresh sees the subscriber gone.
        let _refresh = refresh;
        let mut rx = rx;
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(response) => {
                    debug!(action_id = %response.action_id, "streaming response");
                    if let Ok(json) = serde_json::to_string(&response) {
                        yield Ok(Event::default().event("response").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "response subscriber lagged, responses dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(keep_alive())
}
