// ============================
// crates/backend-lib/src/handlers/stream.rs
// ============================
//! Server-sent event streams.
//!
//! Each connection gets an unbounded channel registered with the hub. The
//! [`Subscription`] guard lives inside the response stream, so the
//! registration goes away when the client disconnects.
use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use metrics::counter;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use super::{locker_or_default, required, LockerQuery, RequestQuery};
use crate::fanout::{Subscription, Topic};
use crate::metrics::STREAM_OPENED;
use crate::{error::AppError, AppState};

/// Client reconnect delay sent with the first event.
pub const RETRY: Duration = Duration::from_millis(1500);

pub async fn status_stream(
    State(state): State<AppState>,
    Query(query): Query<RequestQuery>,
) -> Result<Response, AppError> {
    let request_id = required(query.request_id, "request_id")?;
    let (tx, rx) = mpsc::unbounded_channel::<Arc<str>>();
    let subscription = state.processor.watch_request(&request_id, Arc::new(tx))?;
    Ok(event_stream(subscription, rx))
}

pub async fn locker_stream(
    State(state): State<AppState>,
    Query(query): Query<LockerQuery>,
) -> Response {
    let locker_id = locker_or_default(&state, query.locker_id);
    let (tx, rx) = mpsc::unbounded_channel::<Arc<str>>();
    let subscription = state.processor.watch_locker(&locker_id, Arc::new(tx));
    event_stream(subscription, rx)
}

fn event_stream(subscription: Subscription, rx: mpsc::UnboundedReceiver<Arc<str>>) -> Response {
    let scope = match subscription.topic() {
        Topic::Request(_) => "request",
        Topic::Locker(_) => "locker",
    };
    counter!(STREAM_OPENED, "scope" => scope).increment(1);
    tracing::debug!(scope, key = subscription.topic().key(), "stream opened");

    let mut first = true;
    let events = UnboundedReceiverStream::new(rx).map(move |json| {
        let _held = &subscription;
        let event = Event::default().event("update").data(&*json);
        let event = if std::mem::take(&mut first) {
            event.retry(RETRY)
        } else {
            event
        };
        Ok::<_, Infallible>(event)
    });

    (
        [("x-accel-buffering", "no")],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response()
}
