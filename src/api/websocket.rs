use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::error::SignalError;
use crate::signal::{ClientMessage, ServerMessage, SignalingRelay};

/// One task per connection pulling inbound frames, one task draining the
/// outbound queue into the sink. The queue sender doubles as the
/// session's transport handle inside the relay.
pub async fn handle_signaling_socket(websocket: WebSocket, relay: Arc<SignalingRelay>) {
    tracing::info!("New signaling WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    let mut session_id: Option<String> = None;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => {
                if message.is_close() {
                    break;
                }
                handle_socket_message(&relay, &tx, &mut session_id, message).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Transport gone: cancel any queued join and run teardown
    if let Some(ref sid) = session_id {
        relay.disconnect(sid).await;
    }
    sender_task.abort();
    tracing::info!(session_id = ?session_id, "Signaling WebSocket connection closed");
}

async fn handle_socket_message(
    relay: &Arc<SignalingRelay>,
    tx: &mpsc::UnboundedSender<Message>,
    session_id: &mut Option<String>,
    message: Message,
) {
    let text = match message.to_str() {
        Ok(text) => text,
        // Binary, ping and pong frames carry no protocol traffic
        Err(_) => return,
    };

    let parsed = match serde_json::from_str::<ClientMessage>(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, raw_message = %text, "Failed to parse client message");
            reply(tx, &ServerMessage::error(&SignalError::from(e)));
            return;
        }
    };

    // Any well-formed traffic refreshes liveness
    if let Some(sid) = session_id.as_deref() {
        relay.touch(sid).await;
    }

    match parsed {
        ClientMessage::CreateRoom {} => {
            if session_id.is_some() {
                reply_err(
                    tx,
                    &SignalError::invariant("connection already attached to a session"),
                );
                return;
            }
            match relay.create_room(tx.clone()).await {
                Ok(session) => *session_id = Some(session.id),
                Err(e) => reply_err(tx, &e),
            }
        }

        ClientMessage::Join { room_code, role } => {
            if session_id.is_some() {
                reply_err(
                    tx,
                    &SignalError::invariant("connection already attached to a session"),
                );
                return;
            }
            match relay.join_room(&room_code, role, tx.clone()).await {
                Ok(outcome) => *session_id = Some(outcome.session().id.clone()),
                Err(e) => reply_err(tx, &e),
            }
        }

        ClientMessage::Offer { sdp } => {
            let Some(sid) = session_id.as_deref() else {
                reply_unattached(tx);
                return;
            };
            if let Err(e) = relay.relay_offer(sid, sdp).await {
                reply_err(tx, &e);
            }
        }

        ClientMessage::Answer { viewer_id, sdp } => {
            let Some(sid) = session_id.as_deref() else {
                reply_unattached(tx);
                return;
            };
            if let Err(e) = relay.relay_answer(sid, &viewer_id, sdp).await {
                reply_err(tx, &e);
            }
        }

        ClientMessage::Ice {
            viewer_id,
            candidate,
            sdp_mid,
            sdp_mline_index,
        } => {
            let Some(sid) = session_id.as_deref() else {
                reply_unattached(tx);
                return;
            };
            let result = relay
                .relay_ice_candidate(sid, viewer_id, candidate, sdp_mid, sdp_mline_index)
                .await;
            if let Err(e) = result {
                reply_err(tx, &e);
            }
        }

        ClientMessage::Established { viewer_id } => {
            let Some(sid) = session_id.as_deref() else {
                reply_unattached(tx);
                return;
            };
            if let Err(e) = relay.mark_established(sid, viewer_id).await {
                reply_err(tx, &e);
            }
        }

        ClientMessage::Leave {} => {
            if let Some(sid) = session_id.take() {
                relay.disconnect(&sid).await;
            }
        }

        ClientMessage::Ping {} => {
            reply(tx, &ServerMessage::Pong {});
        }
    }
}

fn reply(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(text) => {
            let _ = tx.send(Message::text(text));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server message");
        }
    }
}

fn reply_err(tx: &mpsc::UnboundedSender<Message>, err: &SignalError) {
    tracing::warn!(kind = err.kind(), error = %err, "Rejecting client request");
    reply(tx, &ServerMessage::error(err));
}

fn reply_unattached(tx: &mpsc::UnboundedSender<Message>) {
    reply_err(
        tx,
        &SignalError::SessionNotFound("connection not attached".to_string()),
    );
}
