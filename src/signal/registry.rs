use std::collections::HashMap;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::mpsc;
use warp::ws::Message;

use crate::error::{Result, SignalError};

use super::protocol::{Role, ServerMessage};

/// Connection-level lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Negotiating,
    Connected,
    Closed,
}

/// A connected participant. Ephemeral, never persisted; the sender is the
/// transport handle and is dropped when the session is closed.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub room_code: String,
    pub role: Role,
    pub sender: mpsc::UnboundedSender<Message>,
    pub state: SessionState,
}

impl Session {
    pub fn send(&self, message: Message) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| SignalError::Transport(self.id.clone()))
    }

    /// Serialize and send a protocol message down this session's transport
    pub fn send_message(&self, message: &ServerMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.send(Message::text(text))
    }
}

fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (&mut rng)
        .sample_iter(Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("s-{}", suffix)
}

/// In-memory session registry. The registry is the single writer of
/// session state transitions; other components request them through
/// `set_state` rather than mutating sessions directly.
pub struct SessionRegistry {
    sessions: tokio::sync::RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Register a participant. A sharer registration while another live
    /// sharer session exists for the room fails with `RoomAlreadyOccupied`;
    /// the single-sharer invariant is enforced here, not by convention.
    pub async fn register(
        &self,
        room_code: &str,
        role: Role,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write().await;

        if role == Role::Sharer {
            let occupied = sessions
                .values()
                .any(|s| s.room_code == room_code && s.role == Role::Sharer);
            if occupied {
                return Err(SignalError::RoomAlreadyOccupied(room_code.to_string()));
            }
        }

        let session = Session {
            id: new_session_id(),
            room_code: room_code.to_string(),
            role,
            sender,
            state: SessionState::Pending,
        };
        sessions.insert(session.id.clone(), session.clone());

        tracing::info!(
            session_id = %session.id,
            room_code = %room_code,
            role = role.as_str(),
            "Session registered"
        );
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    pub async fn find_sharer(&self, room_code: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .find(|s| s.room_code == room_code && s.role == Role::Sharer)
            .cloned()
    }

    pub async fn list_viewers(&self, room_code: &str) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.room_code == room_code && s.role == Role::Viewer)
            .cloned()
            .collect()
    }

    pub async fn set_state(&self, session_id: &str, state: SessionState) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SignalError::SessionNotFound(session_id.to_string()))?;
        session.state = state;
        tracing::debug!(session_id = %session_id, state = ?state, "Session state updated");
        Ok(())
    }

    /// Remove a session and release its transport handle. Idempotent:
    /// closing an already-closed session is a no-op, since disconnect
    /// notifications can race with explicit teardown.
    pub async fn close(&self, session_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let mut removed = sessions.remove(session_id)?;
        removed.state = SessionState::Closed;
        tracing::info!(
            session_id = %session_id,
            room_code = %removed.room_code,
            role = removed.role.as_str(),
            "Session closed"
        );
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> mpsc::UnboundedSender<Message> {
        mpsc::unbounded_channel().0
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = SessionRegistry::new();
        let session = registry
            .register("AB12C3", Role::Viewer, sender())
            .await
            .unwrap();
        assert!(session.id.starts_with("s-"));
        assert_eq!(session.state, SessionState::Pending);

        let fetched = registry.get(&session.id).await.unwrap();
        assert_eq!(fetched.room_code, "AB12C3");
        assert_eq!(fetched.role, Role::Viewer);
    }

    #[tokio::test]
    async fn test_single_sharer_invariant() {
        let registry = SessionRegistry::new();
        registry
            .register("AB12C3", Role::Sharer, sender())
            .await
            .unwrap();

        let err = registry
            .register("AB12C3", Role::Sharer, sender())
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::RoomAlreadyOccupied(_)));

        // A different room is unaffected
        registry
            .register("ZZ12C3", Role::Sharer, sender())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sharer_slot_frees_on_close() {
        let registry = SessionRegistry::new();
        let first = registry
            .register("AB12C3", Role::Sharer, sender())
            .await
            .unwrap();
        registry.close(&first.id).await;

        registry
            .register("AB12C3", Role::Sharer, sender())
            .await
            .expect("sharer slot should free after close");
    }

    #[tokio::test]
    async fn test_find_sharer_and_list_viewers() {
        let registry = SessionRegistry::new();
        let sharer = registry
            .register("AB12C3", Role::Sharer, sender())
            .await
            .unwrap();
        let v1 = registry
            .register("AB12C3", Role::Viewer, sender())
            .await
            .unwrap();
        let v2 = registry
            .register("AB12C3", Role::Viewer, sender())
            .await
            .unwrap();
        registry
            .register("OTHER1", Role::Viewer, sender())
            .await
            .unwrap();

        let found = registry.find_sharer("AB12C3").await.unwrap();
        assert_eq!(found.id, sharer.id);
        assert!(registry.find_sharer("OTHER1").await.is_none());

        let viewers = registry.list_viewers("AB12C3").await;
        let mut ids: Vec<String> = viewers.into_iter().map(|s| s.id).collect();
        ids.sort();
        let mut expected = vec![v1.id, v2.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let registry = SessionRegistry::new();
        let session = registry
            .register("AB12C3", Role::Viewer, sender())
            .await
            .unwrap();

        assert!(registry.close(&session.id).await.is_some());
        assert!(registry.close(&session.id).await.is_none());
        assert!(registry.close("s-neverexisted").await.is_none());
    }

    #[tokio::test]
    async fn test_set_state() {
        let registry = SessionRegistry::new();
        let session = registry
            .register("AB12C3", Role::Viewer, sender())
            .await
            .unwrap();

        registry
            .set_state(&session.id, SessionState::Negotiating)
            .await
            .unwrap();
        assert_eq!(
            registry.get(&session.id).await.unwrap().state,
            SessionState::Negotiating
        );

        let err = registry
            .set_state("s-neverexisted", SessionState::Closed)
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::SessionNotFound(_)));
    }
}
