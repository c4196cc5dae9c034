//! WebSocket upgrade handler and per-connection task pair.
//!
//! Each connection runs one writer (events and pings share a single send
//! path) and one reader (the heartbeat deadline). Either side failing tears
//! the connection down: unsubscribe from the bus, update presence, publish
//! the presence events.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use ohq_core::Id;
use ohq_events::event::names;
use ohq_events::{topics, WsEvent};
use serde_json::json;

use crate::middleware::context::QueueCtx;
use crate::state::AppState;
use crate::ws::presence::{ConnectionClosed, ConnectionOpened};

/// Interval between application-level pings. The ping is a JSON message
/// rather than a protocol ping frame so browser clients can observe it.
const PING_INTERVAL: Duration = Duration::from_secs(10);

/// Extra time granted to clients past the interval before the read side
/// declares the connection dead.
const PING_SLACK: Duration = Duration::from_secs(2);

/// GET /queues/{id}/ws
///
/// Upgrade the request and attach the connection to the queue's topic set:
/// always the generic topic, admin or non-privileged by capability, and the
/// viewer's email topic when authenticated.
pub async fn queue_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(ctx): Extension<QueueCtx>,
) -> Response {
    let queue = ctx.queue.id.clone();
    let email = ctx.identity.map(|identity| identity.email);

    let mut topic_set = vec![topics::generic(&queue)];
    if ctx.is_admin {
        topic_set.push(topics::admin(&queue));
    } else {
        topic_set.push(topics::non_privileged(&queue));
    }
    if let Some(email) = &email {
        topic_set.push(topics::email(&queue, email));
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, queue, topic_set, email))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    queue: Id,
    topic_set: Vec<String>,
    email: Option<String>,
) {
    // Subscribe before announcing presence so this connection cannot miss
    // events triggered by its own arrival.
    let subscription = state.bus.subscribe(topic_set);
    let subscription_id = subscription.id;
    let mut events = subscription.receiver;

    let opened = state.presence.connect(&queue, email.as_deref());
    publish_opened(&state, &queue, email.as_deref(), opened);

    if email.is_some() {
        tracing::info!(queue = %queue, "websocket connection opened");
    }

    let (mut sink, mut stream) = socket.split();

    // Writer: single send path for bus events and pings.
    let send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await; // the first tick fires immediately

        loop {
            let event = tokio::select! {
                _ = ping.tick() => WsEvent::new(names::PING, serde_json::Value::Null),
                received = events.recv() => match received {
                    Some(event) => event,
                    // Unsubscribed or dropped by the bus as too slow.
                    None => break,
                },
            };

            let Ok(text) = serde_json::to_string(&event) else {
                break;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: any client frame resets the deadline; silence past the ping
    // interval plus slack closes the connection.
    loop {
        match tokio::time::timeout(PING_INTERVAL + PING_SLACK, stream.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_))) => break,
            Err(_) => {
                tracing::debug!(queue = %queue, "websocket heartbeat deadline expired");
                break;
            }
        }
    }

    state.bus.unsubscribe(subscription_id);
    send_task.abort();

    let closed = state.presence.disconnect(&queue, email.as_deref());
    publish_closed(&state, &queue, email.as_deref(), closed);

    if email.is_some() {
        tracing::info!(queue = %queue, "websocket connection closed");
    }
}

fn publish_opened(state: &AppState, queue: &Id, email: Option<&str>, opened: ConnectionOpened) {
    state.bus.publish(
        &topics::admin(queue),
        &WsEvent::new(names::QUEUE_CONNECTIONS_UPDATE, opened.connections),
    );
    if opened.first_for_email {
        if let Some(email) = email {
            state.bus.publish(
                &topics::admin(queue),
                &WsEvent::new(
                    names::USER_STATUS_UPDATE,
                    json!({"email": email, "status": "online"}),
                ),
            );
        }
    }
}

fn publish_closed(state: &AppState, queue: &Id, email: Option<&str>, closed: ConnectionClosed) {
    state.bus.publish(
        &topics::admin(queue),
        &WsEvent::new(names::QUEUE_CONNECTIONS_UPDATE, closed.connections),
    );
    if closed.last_for_email {
        if let Some(email) = email {
            state.bus.publish(
                &topics::admin(queue),
                &WsEvent::new(
                    names::USER_STATUS_UPDATE,
                    json!({"email": email, "status": "offline"}),
                ),
            );
        }
    }
}
