//! `WebSocket` handler for observers and participants.
//!
//! Clients connect to `GET /ws`. On connect they receive one `init` event
//! with the full session snapshot, then every event the dispatcher
//! publishes, in order. Clients may send `user_submit` events over the same
//! socket.
//!
//! A client that falls behind the broadcast buffer is resynchronised with a
//! fresh `init` rather than skipping ahead silently.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use charge_types::{ClientEvent, ConnectionId, NamePayload, ServerEvent};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::dispatcher::{DispatchError, DispatcherHandle, Subscription};
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle for one client.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let id = ConnectionId::new();
    debug!(%id, "Observer connected");

    let Some(mut events) = bootstrap(&mut socket, &state, id).await else {
        return;
    };

    loop {
        tokio::select! {
            // Forward dispatcher events.
            result = events.recv() => {
                let Some(event) = next_outbound(result, &mut events, &state.dispatcher, id).await
                else {
                    return;
                };
                if send_event(&mut socket, &event).await.is_err() {
                    debug!(%id, "Observer disconnected (send failed)");
                    return;
                }
            }
            // Client frames.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%id, "Observer disconnected");
                        return;
                    }
                    Some(Ok(Message::Text(text))) => {
                        handle_client_text(&state, id, text.as_str()).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%id, "Observer disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Binary and pong frames carry nothing for us.
                    }
                }
            }
        }
    }
}

/// Subscribe and send `init`. `None` means the socket should close.
async fn bootstrap(
    socket: &mut WebSocket,
    state: &AppState,
    id: ConnectionId,
) -> Option<broadcast::Receiver<ServerEvent>> {
    let Subscription { init, events } = match state.dispatcher.connect().await {
        Ok(sub) => sub,
        Err(e) => {
            warn!(%id, error = %e, "Could not subscribe observer");
            return None;
        }
    };
    if send_event(socket, &ServerEvent::Init(Box::new(init))).await.is_err() {
        debug!(%id, "Observer disconnected before init");
        return None;
    }
    Some(events)
}

/// Turn one broadcast receive into the next frame for this observer.
///
/// A lagged receiver is replaced with a fresh subscription and the observer
/// gets that subscription's `init` instead of the skipped events. `None`
/// means the stream is over and the socket should close.
async fn next_outbound(
    result: Result<ServerEvent, RecvError>,
    events: &mut broadcast::Receiver<ServerEvent>,
    dispatcher: &DispatcherHandle,
    id: ConnectionId,
) -> Option<ServerEvent> {
    match result {
        Ok(event) => Some(event),
        Err(RecvError::Lagged(skipped)) => {
            debug!(%id, skipped, "Observer lagged, resynchronising");
            match dispatcher.connect().await {
                Ok(Subscription { init, events: fresh }) => {
                    *events = fresh;
                    Some(ServerEvent::Init(Box::new(init)))
                }
                Err(e) => {
                    warn!(%id, error = %e, "Could not resubscribe lagged observer");
                    None
                }
            }
        }
        Err(RecvError::Closed) => {
            debug!(%id, "Broadcast channel closed, shutting down WebSocket");
            None
        }
    }
}

/// Parse and apply one client text frame. Bad frames are logged and dropped.
async fn handle_client_text(state: &AppState, id: ConnectionId, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%id, error = %e, "Ignoring unparseable client frame");
            return;
        }
    };

    match event {
        ClientEvent::UserSubmit(NamePayload { name }) => {
            match state.dispatcher.submit(&name).await {
                Ok(_) => {}
                Err(DispatchError::Rejected(e)) => {
                    warn!(%id, error = %e, "Rejected malformed submission");
                }
                Err(DispatchError::Closed) => {
                    warn!(%id, "Submission dropped, dispatcher not running");
                }
            }
        }
    }
}

/// Serialize and send one event as a text frame.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(event = event.name(), "Failed to serialize server event: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
