use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::{Result, SignalError};

/// Per-(sharer, viewer) negotiation state. Room-level activity and
/// pairing-level progress are tracked separately: a room stays active
/// while individual viewer negotiations are independently in flight,
/// and stale or duplicate SDP traffic is rejected per pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    AwaitingOffer,
    OfferSent,
    AwaitingAnswer,
    AnswerSent,
    IceExchange,
    Established,
    Closed,
}

impl PairingState {
    pub fn name(&self) -> &'static str {
        match self {
            PairingState::AwaitingOffer => "awaiting_offer",
            PairingState::OfferSent => "offer_sent",
            PairingState::AwaitingAnswer => "awaiting_answer",
            PairingState::AnswerSent => "answer_sent",
            PairingState::IceExchange => "ice_exchange",
            PairingState::Established => "established",
            PairingState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pairing {
    pub viewer_id: String,
    pub sharer_id: String,
    pub room_code: String,
    pub state: PairingState,
    /// Whether this pairing has contributed to the room's viewer count
    pub counted: bool,
}

/// Pairings keyed by viewer session id. One sharer has an independent
/// pairing per viewer, so answers and ICE candidates can be routed to
/// exactly the originating peer.
pub struct PairingTable {
    pairings: RwLock<HashMap<String, Pairing>>,
}

impl PairingTable {
    pub fn new() -> Self {
        Self {
            pairings: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, viewer_id: &str, sharer_id: &str, room_code: &str) {
        let mut pairings = self.pairings.write().await;
        pairings.insert(
            viewer_id.to_string(),
            Pairing {
                viewer_id: viewer_id.to_string(),
                sharer_id: sharer_id.to_string(),
                room_code: room_code.to_string(),
                state: PairingState::AwaitingOffer,
                counted: false,
            },
        );
        tracing::debug!(
            viewer_id = %viewer_id,
            sharer_id = %sharer_id,
            room_code = %room_code,
            "Pairing created"
        );
    }

    pub async fn get(&self, viewer_id: &str) -> Option<Pairing> {
        let pairings = self.pairings.read().await;
        pairings.get(viewer_id).cloned()
    }

    fn checked<'a>(
        pairings: &'a mut HashMap<String, Pairing>,
        viewer_id: &str,
        operation: &'static str,
    ) -> Result<&'a mut Pairing> {
        let pairing = pairings
            .get_mut(viewer_id)
            .ok_or_else(|| SignalError::PeerUnavailable(viewer_id.to_string()))?;
        if pairing.state == PairingState::Closed {
            // Traffic after teardown is a client bug to surface, not drop
            tracing::warn!(
                viewer_id = %viewer_id,
                operation = operation,
                "Relay call against closed pairing"
            );
            return Err(SignalError::PairingClosed(viewer_id.to_string()));
        }
        Ok(pairing)
    }

    /// An offer may only be relayed while the pairing awaits one
    pub async fn begin_offer(&self, viewer_id: &str) -> Result<Pairing> {
        let mut pairings = self.pairings.write().await;
        let pairing = Self::checked(&mut pairings, viewer_id, "offer")?;
        if pairing.state != PairingState::AwaitingOffer {
            return Err(SignalError::InvalidTransition {
                viewer_id: viewer_id.to_string(),
                operation: "offer",
                state: pairing.state.name(),
            });
        }
        pairing.state = PairingState::OfferSent;
        Ok(pairing.clone())
    }

    /// Once the offer has reached the sharer the pairing waits for its answer
    pub async fn offer_delivered(&self, viewer_id: &str) {
        let mut pairings = self.pairings.write().await;
        if let Some(pairing) = pairings.get_mut(viewer_id) {
            if pairing.state == PairingState::OfferSent {
                pairing.state = PairingState::AwaitingAnswer;
            }
        }
    }

    /// An answer is valid only for a pairing with an outstanding offer,
    /// and is delivered to exactly the originating viewer.
    pub async fn begin_answer(&self, viewer_id: &str) -> Result<Pairing> {
        let mut pairings = self.pairings.write().await;
        let pairing = Self::checked(&mut pairings, viewer_id, "answer")?;
        match pairing.state {
            PairingState::OfferSent | PairingState::AwaitingAnswer => {
                pairing.state = PairingState::AnswerSent;
                Ok(pairing.clone())
            }
            state => Err(SignalError::InvalidTransition {
                viewer_id: viewer_id.to_string(),
                operation: "answer",
                state: state.name(),
            }),
        }
    }

    /// ICE candidates flow from either peer once the offer has been
    /// delivered. Contents are not interpreted here.
    pub async fn note_ice(&self, viewer_id: &str) -> Result<Pairing> {
        let mut pairings = self.pairings.write().await;
        let pairing = Self::checked(&mut pairings, viewer_id, "ice")?;
        match pairing.state {
            PairingState::AnswerSent => {
                pairing.state = PairingState::IceExchange;
                Ok(pairing.clone())
            }
            PairingState::AwaitingAnswer
            | PairingState::IceExchange
            | PairingState::Established => Ok(pairing.clone()),
            state => Err(SignalError::InvalidTransition {
                viewer_id: viewer_id.to_string(),
                operation: "ice",
                state: state.name(),
            }),
        }
    }

    /// Transition to `Established` on the first track/connection signal.
    /// Returns true only the first time, so the viewer count is
    /// incremented exactly once per pairing.
    pub async fn mark_established(&self, viewer_id: &str) -> Result<bool> {
        let mut pairings = self.pairings.write().await;
        let pairing = Self::checked(&mut pairings, viewer_id, "established")?;
        match pairing.state {
            PairingState::Established => Ok(false),
            PairingState::AnswerSent | PairingState::IceExchange => {
                pairing.state = PairingState::Established;
                pairing.counted = true;
                tracing::info!(
                    viewer_id = %viewer_id,
                    sharer_id = %pairing.sharer_id,
                    room_code = %pairing.room_code,
                    "Pairing established"
                );
                Ok(true)
            }
            state => Err(SignalError::InvalidTransition {
                viewer_id: viewer_id.to_string(),
                operation: "established",
                state: state.name(),
            }),
        }
    }

    /// Close a pairing. Idempotent; returns the pairing as it was before
    /// closing (including whether it had been counted) only on the first
    /// call, so teardown never double-decrements.
    pub async fn close(&self, viewer_id: &str) -> Option<Pairing> {
        let mut pairings = self.pairings.write().await;
        let pairing = pairings.get_mut(viewer_id)?;
        if pairing.state == PairingState::Closed {
            return None;
        }
        let before = pairing.clone();
        pairing.state = PairingState::Closed;
        pairing.counted = false;
        tracing::debug!(viewer_id = %viewer_id, "Pairing closed");
        Some(before)
    }

    /// Close every pairing attached to a sharer, returning the ones that
    /// were still open.
    pub async fn close_for_sharer(&self, sharer_id: &str) -> Vec<Pairing> {
        let mut pairings = self.pairings.write().await;
        let mut closed = Vec::new();
        for pairing in pairings.values_mut() {
            if pairing.sharer_id == sharer_id && pairing.state != PairingState::Closed {
                closed.push(pairing.clone());
                pairing.state = PairingState::Closed;
                pairing.counted = false;
            }
        }
        closed
    }

    /// Drop a pairing entirely once its viewer session is gone
    pub async fn remove(&self, viewer_id: &str) {
        let mut pairings = self.pairings.write().await;
        pairings.remove(viewer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_with_pairing() -> PairingTable {
        let table = PairingTable::new();
        table.insert("viewer-1", "sharer-1", "AB12C3").await;
        table
    }

    #[tokio::test]
    async fn test_happy_path_transitions() {
        let table = table_with_pairing().await;

        let p = table.begin_offer("viewer-1").await.unwrap();
        assert_eq!(p.state, PairingState::OfferSent);
        table.offer_delivered("viewer-1").await;
        assert_eq!(
            table.get("viewer-1").await.unwrap().state,
            PairingState::AwaitingAnswer
        );

        let p = table.begin_answer("viewer-1").await.unwrap();
        assert_eq!(p.state, PairingState::AnswerSent);

        let p = table.note_ice("viewer-1").await.unwrap();
        assert_eq!(p.state, PairingState::IceExchange);

        assert!(table.mark_established("viewer-1").await.unwrap());
        assert_eq!(
            table.get("viewer-1").await.unwrap().state,
            PairingState::Established
        );
    }

    #[tokio::test]
    async fn test_duplicate_offer_rejected() {
        let table = table_with_pairing().await;
        table.begin_offer("viewer-1").await.unwrap();

        let err = table.begin_offer("viewer-1").await.unwrap_err();
        assert!(matches!(err, SignalError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_answer_requires_outstanding_offer() {
        let table = table_with_pairing().await;
        let err = table.begin_answer("viewer-1").await.unwrap_err();
        assert!(matches!(err, SignalError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_ice_before_offer_delivery_rejected() {
        let table = table_with_pairing().await;
        let err = table.note_ice("viewer-1").await.unwrap_err();
        assert!(matches!(err, SignalError::InvalidTransition { .. }));

        table.begin_offer("viewer-1").await.unwrap();
        let err = table.note_ice("viewer-1").await.unwrap_err();
        assert!(matches!(err, SignalError::InvalidTransition { .. }));

        table.offer_delivered("viewer-1").await;
        table.note_ice("viewer-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_established_counts_once() {
        let table = table_with_pairing().await;
        table.begin_offer("viewer-1").await.unwrap();
        table.offer_delivered("viewer-1").await;
        table.begin_answer("viewer-1").await.unwrap();

        assert!(table.mark_established("viewer-1").await.unwrap());
        assert!(!table.mark_established("viewer-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_traffic_after_close_fails_pairing_closed() {
        let table = table_with_pairing().await;
        table.close("viewer-1").await.unwrap();

        for err in [
            table.begin_offer("viewer-1").await.unwrap_err(),
            table.begin_answer("viewer-1").await.unwrap_err(),
            table.note_ice("viewer-1").await.unwrap_err(),
            table.mark_established("viewer-1").await.unwrap_err(),
        ] {
            assert!(matches!(err, SignalError::PairingClosed(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_pairing_is_peer_unavailable() {
        let table = PairingTable::new();
        let err = table.begin_offer("viewer-ghost").await.unwrap_err();
        assert!(matches!(err, SignalError::PeerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_reports_counted() {
        let table = table_with_pairing().await;
        table.begin_offer("viewer-1").await.unwrap();
        table.offer_delivered("viewer-1").await;
        table.begin_answer("viewer-1").await.unwrap();
        table.mark_established("viewer-1").await.unwrap();

        let before = table.close("viewer-1").await.unwrap();
        assert!(before.counted);
        assert!(table.close("viewer-1").await.is_none());
    }

    #[tokio::test]
    async fn test_close_for_sharer_sweeps_open_pairings() {
        let table = PairingTable::new();
        table.insert("viewer-1", "sharer-1", "AB12C3").await;
        table.insert("viewer-2", "sharer-1", "AB12C3").await;
        table.insert("viewer-3", "sharer-2", "ZZ12C3").await;
        table.close("viewer-2").await.unwrap();

        let closed = table.close_for_sharer("sharer-1").await;
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].viewer_id, "viewer-1");

        // Unrelated sharer untouched
        assert_ne!(
            table.get("viewer-3").await.unwrap().state,
            PairingState::Closed
        );
    }
}
