use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::SignalError;

use super::pairing::PairingTable;
use super::protocol::{Role, ServerMessage};
use super::registry::{SessionRegistry, SessionState};
use super::store::RoomStore;

/// Monitors session liveness and drives teardown. Liveness comes from
/// two sources: transport-level close events (the WebSocket handler
/// ending) and heartbeat timestamps swept on an interval. Both funnel
/// into `handle_transport_closed`, which is idempotent so a disconnect
/// racing a timeout sweep resolves to a single teardown.
pub struct ConnectionSupervisor {
    store: Arc<RoomStore>,
    registry: Arc<SessionRegistry>,
    pairings: Arc<PairingTable>,
    last_seen: RwLock<HashMap<String, Instant>>,
}

impl ConnectionSupervisor {
    pub fn new(
        store: Arc<RoomStore>,
        registry: Arc<SessionRegistry>,
        pairings: Arc<PairingTable>,
    ) -> Self {
        Self {
            store,
            registry,
            pairings,
            last_seen: RwLock::new(HashMap::new()),
        }
    }

    /// Begin liveness tracking for a session
    pub async fn track(&self, session_id: &str) {
        let mut last_seen = self.last_seen.write().await;
        last_seen.insert(session_id.to_string(), Instant::now());
    }

    /// Refresh a session's liveness timestamp on any inbound traffic
    pub async fn touch(&self, session_id: &str) {
        let mut last_seen = self.last_seen.write().await;
        if let Some(seen) = last_seen.get_mut(session_id) {
            *seen = Instant::now();
        }
    }

    /// Sessions whose last traffic is older than `timeout`
    pub async fn expired(&self, timeout: Duration) -> Vec<String> {
        let last_seen = self.last_seen.read().await;
        let now = Instant::now();
        last_seen
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) > timeout)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Tear down a session whose transport is gone. Idempotent: the
    /// registry close is the gate, so a second invocation for the same
    /// session returns without side effects. Returns whether this call
    /// performed the teardown.
    pub async fn handle_transport_closed(&self, session_id: &str) -> bool {
        {
            let mut last_seen = self.last_seen.write().await;
            last_seen.remove(session_id);
        }

        let session = match self.registry.close(session_id).await {
            Some(session) => session,
            None => return false,
        };

        match session.role {
            Role::Sharer => self.teardown_sharer(&session.id, &session.room_code).await,
            Role::Viewer => self.teardown_viewer(&session.id, &session.room_code).await,
        }
        true
    }

    /// Sharer loss deactivates the room: every dependent pairing closes,
    /// every attached viewer is notified and detached, the sharer id is
    /// cleared.
    async fn teardown_sharer(&self, sharer_id: &str, room_code: &str) {
        tracing::info!(
            session_id = %sharer_id,
            room_code = %room_code,
            "Sharer transport closed, deactivating room"
        );

        let closed = self.pairings.close_for_sharer(sharer_id).await;
        for pairing in closed {
            if pairing.counted {
                self.decrement_viewers(room_code).await;
            }

            if let Some(viewer) = self.registry.get(&pairing.viewer_id).await {
                let notice = ServerMessage::PeerLeft {
                    session_id: sharer_id.to_string(),
                    role: Role::Sharer,
                };
                if viewer.send_message(&notice).is_err() {
                    tracing::debug!(
                        viewer_id = %pairing.viewer_id,
                        "Viewer transport already gone while notifying peer_left"
                    );
                }
                // Detached viewers fall back to waiting for a new sharer
                let _ = self
                    .registry
                    .set_state(&pairing.viewer_id, SessionState::Pending)
                    .await;
            }
        }

        match self.store.set_active(room_code, false, None).await {
            Ok(()) => {}
            Err(SignalError::RoomNotFound(_)) => {
                // Room was administratively deleted while the sharer was live
                tracing::debug!(room_code = %room_code, "Room gone before deactivation");
            }
            Err(e) => {
                tracing::error!(room_code = %room_code, error = %e, "Failed to deactivate room");
            }
        }
    }

    /// Viewer loss closes only its own pairing; the room and sharer are
    /// untouched.
    async fn teardown_viewer(&self, viewer_id: &str, room_code: &str) {
        tracing::info!(
            session_id = %viewer_id,
            room_code = %room_code,
            "Viewer transport closed"
        );

        if let Some(pairing) = self.pairings.close(viewer_id).await {
            if pairing.counted {
                self.decrement_viewers(room_code).await;
            }

            if let Some(sharer) = self.registry.get(&pairing.sharer_id).await {
                let notice = ServerMessage::PeerLeft {
                    session_id: viewer_id.to_string(),
                    role: Role::Viewer,
                };
                if sharer.send_message(&notice).is_err() {
                    tracing::debug!(
                        sharer_id = %pairing.sharer_id,
                        "Sharer transport already gone while notifying peer_left"
                    );
                }
            }
        }

        // The viewer session is gone for good, so its pairing entry can go too
        self.pairings.remove(viewer_id).await;
    }

    async fn decrement_viewers(&self, room_code: &str) {
        match self.store.adjust_viewer_count(room_code, -1).await {
            Ok(_) => {}
            Err(SignalError::RoomNotFound(_)) => {}
            Err(e) => {
                // Bookkeeping bug upstream; the store has already clamped
                tracing::error!(room_code = %room_code, error = %e, "Viewer count decrement failed");
            }
        }
    }
}
