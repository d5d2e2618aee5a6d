use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio::time::sleep;
use warp::ws::Message;

use crate::error::{Result, SignalError};

use super::code;
use super::pairing::PairingTable;
use super::protocol::{Role, ServerMessage};
use super::registry::{Session, SessionRegistry, SessionState};
use super::store::RoomStore;
use super::supervisor::ConnectionSupervisor;

/// Result of a join request. A viewer join with no live sharer is queued
/// rather than blocked, so the caller's receive loop keeps running and a
/// disconnect can cancel the wait promptly.
#[derive(Debug)]
pub enum JoinOutcome {
    Joined(Session),
    Pending(Session),
}

impl JoinOutcome {
    pub fn session(&self) -> &Session {
        match self {
            JoinOutcome::Joined(s) | JoinOutcome::Pending(s) => s,
        }
    }
}

/// The signaling core: room lifecycle, handshake relay between exactly
/// matched peers, and disconnect-driven cleanup. Holds the store, the
/// session registry, the pairing table and the supervisor; the WebSocket
/// layer calls into this and nothing else.
pub struct SignalingRelay {
    store: Arc<RoomStore>,
    registry: Arc<SessionRegistry>,
    pairings: Arc<PairingTable>,
    supervisor: Arc<ConnectionSupervisor>,
    /// Viewer joins waiting for a sharer, keyed by room code
    pending_joins: RwLock<HashMap<String, Vec<String>>>,
    join_wait: Duration,
}

impl SignalingRelay {
    pub fn new(join_wait: Duration) -> Self {
        let store = Arc::new(RoomStore::new());
        let registry = Arc::new(SessionRegistry::new());
        let pairings = Arc::new(PairingTable::new());
        let supervisor = Arc::new(ConnectionSupervisor::new(
            store.clone(),
            registry.clone(),
            pairings.clone(),
        ));

        Self {
            store,
            registry,
            pairings,
            supervisor,
            pending_joins: RwLock::new(HashMap::new()),
            join_wait,
        }
    }

    pub fn store(&self) -> Arc<RoomStore> {
        self.store.clone()
    }

    /// Mint a fresh room and attach the caller as its sharer
    pub async fn create_room(
        &self,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Result<Session> {
        let room_code = code::generate_unique(&self.store).await?;
        self.store.create_room(&room_code).await?;

        let session = self.attach_sharer(&room_code, sender).await?;
        let greeting = session.send_message(&ServerMessage::RoomCreated {
            room_code: room_code.clone(),
            session_id: session.id.clone(),
        });
        if let Err(e) = greeting {
            self.disconnect(&session.id).await;
            return Err(e);
        }

        tracing::info!(
            room_code = %room_code,
            session_id = %session.id,
            "Room created by sharer"
        );
        Ok(session)
    }

    /// Attach to an existing room. Sharer joins (re)activate an
    /// unoccupied room; viewer joins require a live sharer or wait for
    /// one up to the configured window.
    pub async fn join_room(
        self: &Arc<Self>,
        room_code: &str,
        role: Role,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Result<JoinOutcome> {
        if !code::validate(room_code) {
            return Err(SignalError::InvalidRoomCode(room_code.to_string()));
        }
        if self.store.get_room(room_code).await.is_none() {
            // Immediate rejection, never queued
            return Err(SignalError::RoomNotFound(room_code.to_string()));
        }

        match role {
            Role::Sharer => {
                let session = self.attach_sharer(room_code, sender).await?;
                let greeting = session.send_message(&ServerMessage::Joined {
                    room_code: room_code.to_string(),
                    session_id: session.id.clone(),
                    role: Role::Sharer,
                });
                if let Err(e) = greeting {
                    self.disconnect(&session.id).await;
                    return Err(e);
                }
                self.flush_pending(room_code).await;
                Ok(JoinOutcome::Joined(session))
            }
            Role::Viewer => self.join_viewer(room_code, sender).await,
        }
    }

    async fn attach_sharer(
        &self,
        room_code: &str,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Result<Session> {
        let session = self
            .registry
            .register(room_code, Role::Sharer, sender)
            .await?;
        self.store
            .set_active(room_code, true, Some(session.id.clone()))
            .await?;
        self.registry
            .set_state(&session.id, SessionState::Connected)
            .await?;
        self.supervisor.track(&session.id).await;
        Ok(session)
    }

    async fn join_viewer(
        self: &Arc<Self>,
        room_code: &str,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Result<JoinOutcome> {
        let session = self
            .registry
            .register(room_code, Role::Viewer, sender)
            .await?;
        self.supervisor.track(&session.id).await;

        if let Some(sharer) = self.registry.find_sharer(room_code).await {
            if let Err(e) = self.pair_viewer(&session, &sharer).await {
                self.disconnect(&session.id).await;
                return Err(e);
            }
            return Ok(JoinOutcome::Joined(session));
        }

        // No sharer yet: queue the join and fail it only if the deadline
        // passes with the sharer still absent.
        {
            let mut pending = self.pending_joins.write().await;
            pending
                .entry(room_code.to_string())
                .or_insert_with(Vec::new)
                .push(session.id.clone());
        }
        tracing::info!(
            session_id = %session.id,
            room_code = %room_code,
            wait_ms = self.join_wait.as_millis() as u64,
            "Viewer queued waiting for sharer"
        );

        // A sharer may have attached between the lookup and the queueing
        if self.registry.find_sharer(room_code).await.is_some() {
            self.flush_pending(room_code).await;
        }

        let relay = self.clone();
        let room = room_code.to_string();
        let session_id = session.id.clone();
        tokio::spawn(async move {
            sleep(relay.join_wait).await;
            relay.expire_pending(&room, &session_id).await;
        });

        Ok(JoinOutcome::Pending(session))
    }

    async fn pair_viewer(&self, viewer: &Session, sharer: &Session) -> Result<()> {
        self.pairings
            .insert(&viewer.id, &sharer.id, &viewer.room_code)
            .await;
        self.registry
            .set_state(&viewer.id, SessionState::Negotiating)
            .await?;
        viewer.send_message(&ServerMessage::Joined {
            room_code: viewer.room_code.clone(),
            session_id: viewer.id.clone(),
            role: Role::Viewer,
        })?;
        tracing::info!(
            viewer_id = %viewer.id,
            sharer_id = %sharer.id,
            room_code = %viewer.room_code,
            "Viewer paired with sharer"
        );
        Ok(())
    }

    /// Attach every queued viewer of a room to its (now live) sharer
    async fn flush_pending(&self, room_code: &str) {
        let sharer = match self.registry.find_sharer(room_code).await {
            Some(sharer) => sharer,
            None => return,
        };

        let queued = {
            let mut pending = self.pending_joins.write().await;
            pending.remove(room_code).unwrap_or_default()
        };

        for viewer_id in queued {
            let viewer = match self.registry.get(&viewer_id).await {
                Some(viewer) => viewer,
                // Cancelled by disconnect while waiting
                None => continue,
            };
            if let Err(e) = self.pair_viewer(&viewer, &sharer).await {
                tracing::warn!(
                    viewer_id = %viewer_id,
                    room_code = %room_code,
                    error = %e,
                    "Failed to attach queued viewer"
                );
            }
        }
    }

    /// Deadline for a queued viewer join. If a sharer showed up without
    /// the queue being flushed, complete the join; otherwise fail it with
    /// a definitive `sharer_not_available`.
    async fn expire_pending(&self, room_code: &str, session_id: &str) {
        let still_queued = {
            let mut pending = self.pending_joins.write().await;
            match pending.get_mut(room_code) {
                Some(queue) => {
                    let found = queue.iter().position(|id| id == session_id);
                    if let Some(idx) = found {
                        queue.remove(idx);
                    }
                    found.is_some()
                }
                None => false,
            }
        };
        if !still_queued {
            return;
        }

        let session = match self.registry.get(session_id).await {
            Some(session) => session,
            None => return,
        };

        if let Some(sharer) = self.registry.find_sharer(room_code).await {
            if self.pair_viewer(&session, &sharer).await.is_ok() {
                return;
            }
        }

        tracing::info!(
            session_id = %session_id,
            room_code = %room_code,
            "No sharer arrived within the wait window"
        );
        let err = SignalError::SharerNotAvailable(room_code.to_string());
        let _ = session.send_message(&ServerMessage::error(&err));
        self.supervisor.handle_transport_closed(session_id).await;
    }

    /// Drop any queued join for a session whose transport closed
    async fn abandon_pending(&self, room_code: &str, session_id: &str) {
        let mut pending = self.pending_joins.write().await;
        if let Some(queue) = pending.get_mut(room_code) {
            queue.retain(|id| id != session_id);
            if queue.is_empty() {
                pending.remove(room_code);
            }
        }
    }

    /// Route a viewer's SDP offer to the room's sharer
    pub async fn relay_offer(&self, session_id: &str, sdp: String) -> Result<()> {
        let session = self.session(session_id).await?;
        if session.role != Role::Viewer {
            return Err(SignalError::InvalidTransition {
                viewer_id: session.id,
                operation: "offer",
                state: "sharer_session",
            });
        }

        let pairing = self.pairings.begin_offer(&session.id).await?;
        let sharer = match self.registry.get(&pairing.sharer_id).await {
            Some(sharer) => sharer,
            None => return Err(SignalError::PeerUnavailable(pairing.sharer_id)),
        };

        let delivery = sharer.send_message(&ServerMessage::Offer {
            viewer_id: session.id.clone(),
            sdp,
        });
        if delivery.is_err() {
            // The sharer can no longer receive anything; tear it down and
            // report the missing peer to the viewer instead.
            self.disconnect(&sharer.id).await;
            return Err(SignalError::PeerUnavailable(sharer.id));
        }

        self.pairings.offer_delivered(&session.id).await;
        tracing::debug!(
            viewer_id = %session.id,
            sharer_id = %sharer.id,
            "Offer relayed"
        );
        Ok(())
    }

    /// Route a sharer's SDP answer to exactly the originating viewer
    pub async fn relay_answer(
        &self,
        session_id: &str,
        viewer_id: &str,
        sdp: String,
    ) -> Result<()> {
        let session = self.session(session_id).await?;
        if session.role != Role::Sharer {
            return Err(SignalError::InvalidTransition {
                viewer_id: session.id,
                operation: "answer",
                state: "viewer_session",
            });
        }
        self.owned_pairing(&session, viewer_id).await?;

        let pairing = self.pairings.begin_answer(viewer_id).await?;
        let viewer = match self.registry.get(&pairing.viewer_id).await {
            Some(viewer) => viewer,
            None => return Err(SignalError::PeerUnavailable(pairing.viewer_id)),
        };

        if viewer.send_message(&ServerMessage::Answer { sdp }).is_err() {
            self.disconnect(&viewer.id).await;
            return Err(SignalError::PeerUnavailable(viewer.id));
        }

        tracing::debug!(
            viewer_id = %viewer_id,
            sharer_id = %session.id,
            "Answer relayed"
        );
        Ok(())
    }

    /// Pipe an ICE candidate to the counterpart peer. Candidates are not
    /// interpreted, only checked for a non-empty payload; per-direction
    /// arrival order is preserved by the single outbound queue per session.
    pub async fn relay_ice_candidate(
        &self,
        session_id: &str,
        viewer_id: Option<String>,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) -> Result<()> {
        if candidate.trim().is_empty() {
            return Err(SignalError::EmptyCandidate);
        }

        let session = self.session(session_id).await?;
        let pairing_key = self.resolve_pairing_key(&session, viewer_id).await?;
        let pairing = self.pairings.note_ice(&pairing_key).await?;

        let target_id = if session.role == Role::Viewer {
            pairing.sharer_id
        } else {
            pairing.viewer_id
        };
        let target = match self.registry.get(&target_id).await {
            Some(target) => target,
            None => return Err(SignalError::PeerUnavailable(target_id)),
        };

        let delivery = target.send_message(&ServerMessage::Ice {
            from: session.id.clone(),
            candidate,
            sdp_mid,
            sdp_mline_index,
        });
        if delivery.is_err() {
            self.disconnect(&target.id).await;
            return Err(SignalError::PeerUnavailable(target.id));
        }
        Ok(())
    }

    /// First track/connection event from either side: the pairing is
    /// established, liveness tracking covers it, and the room's viewer
    /// count goes up exactly once.
    pub async fn mark_established(
        &self,
        session_id: &str,
        viewer_id: Option<String>,
    ) -> Result<()> {
        let session = self.session(session_id).await?;
        let pairing_key = self.resolve_pairing_key(&session, viewer_id).await?;

        let newly = self.pairings.mark_established(&pairing_key).await?;
        if !newly {
            return Ok(());
        }

        self.registry
            .set_state(&pairing_key, SessionState::Connected)
            .await?;
        if let Err(e) = self
            .store
            .adjust_viewer_count(&session.room_code, 1)
            .await
        {
            tracing::error!(
                room_code = %session.room_code,
                error = %e,
                "Failed to count established viewer"
            );
        }
        Ok(())
    }

    /// Explicit leave or transport close; also cancels an in-flight
    /// queued join so the client never waits out the full window.
    pub async fn disconnect(&self, session_id: &str) {
        if let Some(session) = self.registry.get(session_id).await {
            self.abandon_pending(&session.room_code, session_id).await;
        }
        self.supervisor.handle_transport_closed(session_id).await;
    }

    /// Refresh liveness on any inbound traffic
    pub async fn touch(&self, session_id: &str) {
        self.supervisor.touch(session_id).await;
    }

    /// Periodic sweep closing sessions that stopped sending traffic
    pub fn start_liveness_sweeper(
        self: Arc<Self>,
        interval: Duration,
        timeout: Duration,
    ) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                for session_id in self.supervisor.expired(timeout).await {
                    tracing::warn!(
                        session_id = %session_id,
                        timeout_secs = timeout.as_secs(),
                        "Session timed out, tearing down"
                    );
                    self.disconnect(&session_id).await;
                }
            }
        });
    }

    async fn session(&self, session_id: &str) -> Result<Session> {
        self.registry
            .get(session_id)
            .await
            .ok_or_else(|| SignalError::SessionNotFound(session_id.to_string()))
    }

    /// The pairing a message belongs to: viewers are their own key,
    /// sharers must address one of their viewers explicitly.
    async fn resolve_pairing_key(
        &self,
        session: &Session,
        viewer_id: Option<String>,
    ) -> Result<String> {
        match session.role {
            Role::Viewer => Ok(session.id.clone()),
            Role::Sharer => {
                let viewer_id = viewer_id
                    .ok_or_else(|| SignalError::PeerUnavailable("unspecified viewer".into()))?;
                self.owned_pairing(session, &viewer_id).await?;
                Ok(viewer_id)
            }
        }
    }

    /// Reject sharer traffic addressed at a pairing it does not own
    async fn owned_pairing(&self, sharer: &Session, viewer_id: &str) -> Result<()> {
        let pairing = self
            .pairings
            .get(viewer_id)
            .await
            .ok_or_else(|| SignalError::PeerUnavailable(viewer_id.to_string()))?;
        if pairing.sharer_id != sharer.id {
            return Err(SignalError::PeerUnavailable(viewer_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    fn relay(join_wait: Duration) -> Arc<SignalingRelay> {
        Arc::new(SignalingRelay::new(join_wait))
    }

    fn channel() -> (
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        mpsc::unbounded_channel()
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<Message>) -> ServerMessage {
        let msg = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed");
        serde_json::from_str(msg.to_str().expect("expected text frame")).expect("bad json")
    }

    #[tokio::test]
    async fn test_create_room_activates_store() {
        let relay = relay(Duration::from_millis(100));
        let (tx, mut rx) = channel();

        let session = relay.create_room(tx).await.unwrap();

        let room_code = match recv(&mut rx).await {
            ServerMessage::RoomCreated {
                room_code,
                session_id,
            } => {
                assert_eq!(session_id, session.id);
                room_code
            }
            other => panic!("expected room_created, got {:?}", other),
        };
        assert!(code::validate(&room_code));

        let room = relay.store().get_room(&room_code).await.unwrap();
        assert!(room.is_active);
        assert_eq!(room.sharer_id.as_deref(), Some(session.id.as_str()));
        assert_eq!(room.viewer_count, 0);
    }

    #[tokio::test]
    async fn test_full_handshake_scenario() {
        let relay = relay(Duration::from_millis(500));
        relay.store().create_room("AB12C3").await.unwrap();

        // Sharer attaches to the pre-created room
        let (sharer_tx, mut sharer_rx) = channel();
        let sharer = relay
            .join_room("AB12C3", Role::Sharer, sharer_tx)
            .await
            .unwrap();
        let sharer_id = sharer.session().id.clone();
        assert!(matches!(
            recv(&mut sharer_rx).await,
            ServerMessage::Joined { .. }
        ));

        let room = relay.store().get_room("AB12C3").await.unwrap();
        assert!(room.is_active);
        assert_eq!(room.sharer_id.as_deref(), Some(sharer_id.as_str()));

        // Viewer joins and is cued to send an offer
        let (viewer_tx, mut viewer_rx) = channel();
        let viewer = relay
            .join_room("AB12C3", Role::Viewer, viewer_tx)
            .await
            .unwrap();
        let viewer_id = viewer.session().id.clone();
        assert!(matches!(viewer, JoinOutcome::Joined(_)));
        match recv(&mut viewer_rx).await {
            ServerMessage::Joined { role, .. } => assert_eq!(role, Role::Viewer),
            other => panic!("expected joined, got {:?}", other),
        }

        // Offer to the sharer
        relay
            .relay_offer(&viewer_id, "sdp-offer".to_string())
            .await
            .unwrap();
        match recv(&mut sharer_rx).await {
            ServerMessage::Offer {
                viewer_id: from,
                sdp,
            } => {
                assert_eq!(from, viewer_id);
                assert_eq!(sdp, "sdp-offer");
            }
            other => panic!("expected offer, got {:?}", other),
        }

        // Answer back to exactly that viewer
        relay
            .relay_answer(&sharer_id, &viewer_id, "sdp-answer".to_string())
            .await
            .unwrap();
        match recv(&mut viewer_rx).await {
            ServerMessage::Answer { sdp } => assert_eq!(sdp, "sdp-answer"),
            other => panic!("expected answer, got {:?}", other),
        }

        // Two ICE candidates in each direction, in order
        for c in ["v-cand-1", "v-cand-2"] {
            relay
                .relay_ice_candidate(&viewer_id, None, c.to_string(), Some("0".into()), Some(0))
                .await
                .unwrap();
        }
        for c in ["s-cand-1", "s-cand-2"] {
            relay
                .relay_ice_candidate(
                    &sharer_id,
                    Some(viewer_id.clone()),
                    c.to_string(),
                    Some("0".into()),
                    Some(0),
                )
                .await
                .unwrap();
        }
        for expected in ["v-cand-1", "v-cand-2"] {
            match recv(&mut sharer_rx).await {
                ServerMessage::Ice { candidate, .. } => assert_eq!(candidate, expected),
                other => panic!("expected ice, got {:?}", other),
            }
        }
        for expected in ["s-cand-1", "s-cand-2"] {
            match recv(&mut viewer_rx).await {
                ServerMessage::Ice { candidate, .. } => assert_eq!(candidate, expected),
                other => panic!("expected ice, got {:?}", other),
            }
        }

        // Connection comes up
        relay.mark_established(&viewer_id, None).await.unwrap();
        assert_eq!(
            relay.store().get_room("AB12C3").await.unwrap().viewer_count,
            1
        );

        // Sharer disconnects: viewer is notified, room deactivates
        relay.disconnect(&sharer_id).await;
        match recv(&mut viewer_rx).await {
            ServerMessage::PeerLeft { role, .. } => assert_eq!(role, Role::Sharer),
            other => panic!("expected peer_left, got {:?}", other),
        }

        let room = relay.store().get_room("AB12C3").await.unwrap();
        assert!(!room.is_active);
        assert!(room.sharer_id.is_none());
        assert_eq!(room.viewer_count, 0);
    }

    #[tokio::test]
    async fn test_join_rejects_malformed_codes() {
        let relay = relay(Duration::from_secs(5));
        for bad in ["ab12c3", "AB12C", "AB12C34", "AB 2C3", ""] {
            let (tx, _rx) = channel();
            let err = relay.join_room(bad, Role::Viewer, tx).await.unwrap_err();
            assert!(
                matches!(err, SignalError::InvalidRoomCode(_)),
                "code {:?} should be rejected before any lookup",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails_immediately() {
        let relay = relay(Duration::from_secs(5));
        let (tx, _rx) = channel();

        let started = Instant::now();
        let err = relay
            .join_room("ZZ9999", Role::Viewer, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::RoomNotFound(_)));
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "unknown room must not enter the wait window"
        );
    }

    #[tokio::test]
    async fn test_viewer_wait_times_out_with_sharer_not_available() {
        let relay = relay(Duration::from_millis(100));
        relay.store().create_room("AB12C3").await.unwrap();

        let (tx, mut rx) = channel();
        let outcome = relay.join_room("AB12C3", Role::Viewer, tx).await.unwrap();
        assert!(matches!(outcome, JoinOutcome::Pending(_)));

        // Failure arrives within the window plus a small epsilon, the
        // recv timeout bounds it at one second
        match recv(&mut rx).await {
            ServerMessage::Error { kind, .. } => assert_eq!(kind, "sharer_not_available"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sharer_arrival_flushes_waiting_viewer() {
        let relay = relay(Duration::from_secs(2));
        relay.store().create_room("AB12C3").await.unwrap();

        let (viewer_tx, mut viewer_rx) = channel();
        let outcome = relay
            .join_room("AB12C3", Role::Viewer, viewer_tx)
            .await
            .unwrap();
        assert!(matches!(outcome, JoinOutcome::Pending(_)));

        let (sharer_tx, _sharer_rx) = channel();
        relay
            .join_room("AB12C3", Role::Sharer, sharer_tx)
            .await
            .unwrap();

        // Queued join completes well before the deadline
        match recv(&mut viewer_rx).await {
            ServerMessage::Joined { role, .. } => assert_eq!(role, Role::Viewer),
            other => panic!("expected joined, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_sharer_rejected() {
        let relay = relay(Duration::from_millis(100));
        let (tx, _rx) = channel();
        let sharer = relay.create_room(tx).await.unwrap();
        let room_code = sharer.room_code.clone();

        let (tx2, _rx2) = channel();
        let err = relay
            .join_room(&room_code, Role::Sharer, tx2)
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::RoomAlreadyOccupied(_)));
    }

    #[tokio::test]
    async fn test_viewer_count_after_joins_and_disconnects() {
        let relay = relay(Duration::from_millis(500));
        let (sharer_tx, _sharer_rx) = channel();
        let sharer = relay.create_room(sharer_tx).await.unwrap();
        let room_code = sharer.room_code.clone();

        // N = 3 viewers negotiate to established
        let mut viewer_ids = Vec::new();
        for _ in 0..3 {
            let (tx, _rx) = channel();
            let outcome = relay
                .join_room(&room_code, Role::Viewer, tx)
                .await
                .unwrap();
            let viewer_id = outcome.session().id.clone();
            relay
                .relay_offer(&viewer_id, "offer".to_string())
                .await
                .unwrap();
            relay
                .relay_answer(&sharer.id, &viewer_id, "answer".to_string())
                .await
                .unwrap();
            relay.mark_established(&viewer_id, None).await.unwrap();
            viewer_ids.push(viewer_id);
        }
        assert_eq!(
            relay.store().get_room(&room_code).await.unwrap().viewer_count,
            3
        );

        // M = 2 of them disconnect
        relay.disconnect(&viewer_ids[0]).await;
        relay.disconnect(&viewer_ids[1]).await;
        assert_eq!(
            relay.store().get_room(&room_code).await.unwrap().viewer_count,
            1
        );

        // A repeated disconnect changes nothing
        relay.disconnect(&viewer_ids[0]).await;
        assert_eq!(
            relay.store().get_room(&room_code).await.unwrap().viewer_count,
            1
        );
    }

    #[tokio::test]
    async fn test_established_signal_is_idempotent_for_count() {
        let relay = relay(Duration::from_millis(500));
        let (sharer_tx, _sharer_rx) = channel();
        let sharer = relay.create_room(sharer_tx).await.unwrap();

        let (tx, _rx) = channel();
        let outcome = relay
            .join_room(&sharer.room_code, Role::Viewer, tx)
            .await
            .unwrap();
        let viewer_id = outcome.session().id.clone();
        relay
            .relay_offer(&viewer_id, "offer".to_string())
            .await
            .unwrap();
        relay
            .relay_answer(&sharer.id, &viewer_id, "answer".to_string())
            .await
            .unwrap();

        // Both sides report the connection event
        relay.mark_established(&viewer_id, None).await.unwrap();
        relay
            .mark_established(&sharer.id, Some(viewer_id.clone()))
            .await
            .unwrap();
        assert_eq!(
            relay
                .store()
                .get_room(&sharer.room_code)
                .await
                .unwrap()
                .viewer_count,
            1
        );
    }

    #[tokio::test]
    async fn test_ice_rejects_empty_candidate() {
        let relay = relay(Duration::from_millis(100));
        let (tx, _rx) = channel();
        let sharer = relay.create_room(tx).await.unwrap();

        let err = relay
            .relay_ice_candidate(&sharer.id, None, "   ".to_string(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::EmptyCandidate));
    }

    #[tokio::test]
    async fn test_traffic_after_sharer_left_reports_pairing_closed() {
        let relay = relay(Duration::from_millis(500));
        let (sharer_tx, _sharer_rx) = channel();
        let sharer = relay.create_room(sharer_tx).await.unwrap();

        let (viewer_tx, mut viewer_rx) = channel();
        let outcome = relay
            .join_room(&sharer.room_code, Role::Viewer, viewer_tx)
            .await
            .unwrap();
        let viewer_id = outcome.session().id.clone();
        recv(&mut viewer_rx).await; // joined

        relay.disconnect(&sharer.id).await;
        recv(&mut viewer_rx).await; // peer_left

        let err = relay
            .relay_offer(&viewer_id, "late-offer".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::PairingClosed(_)));
    }

    #[tokio::test]
    async fn test_answer_for_foreign_pairing_rejected() {
        let relay = relay(Duration::from_millis(500));

        let (tx_a, _rx_a) = channel();
        let sharer_a = relay.create_room(tx_a).await.unwrap();
        let (tx_b, _rx_b) = channel();
        let sharer_b = relay.create_room(tx_b).await.unwrap();

        let (viewer_tx, _viewer_rx) = channel();
        let outcome = relay
            .join_room(&sharer_a.room_code, Role::Viewer, viewer_tx)
            .await
            .unwrap();
        let viewer_id = outcome.session().id.clone();
        relay
            .relay_offer(&viewer_id, "offer".to_string())
            .await
            .unwrap();

        let err = relay
            .relay_answer(&sharer_b.id, &viewer_id, "answer".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::PeerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_disconnect_cancels_pending_join() {
        let relay = relay(Duration::from_millis(150));
        relay.store().create_room("AB12C3").await.unwrap();

        let (viewer_tx, mut viewer_rx) = channel();
        let outcome = relay
            .join_room("AB12C3", Role::Viewer, viewer_tx.clone())
            .await
            .unwrap();
        let viewer_id = outcome.session().id.clone();

        // Transport closes while the join is still queued
        relay.disconnect(&viewer_id).await;
        drop(viewer_tx);

        // All transport handles are released, so the channel drains to
        // a close with no sharer_not_available ever sent
        assert!(
            timeout(Duration::from_millis(400), viewer_rx.recv())
                .await
                .expect("channel should close instead of timing out")
                .is_none()
        );

        // A sharer arriving later sees no stale queued viewer
        let (sharer_tx, mut sharer_rx) = channel();
        relay
            .join_room("AB12C3", Role::Sharer, sharer_tx)
            .await
            .unwrap();
        recv(&mut sharer_rx).await; // joined
        assert!(
            timeout(Duration::from_millis(100), sharer_rx.recv())
                .await
                .is_err(),
            "no traffic expected from the cancelled viewer"
        );
    }
}
