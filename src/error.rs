use thiserror::Error;

/// Custom error types for the signaling server
#[derive(Debug, Error)]
pub enum SignalError {
    /// Room and session lookup errors
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),

    /// Registration and lifecycle errors
    #[error("Room {0} already has an active sharer")]
    RoomAlreadyOccupied(String),

    #[error("No sharer available in room {0}")]
    SharerNotAvailable(String),

    #[error("Peer unavailable for session {0}")]
    PeerUnavailable(String),

    /// Relay state-machine errors
    #[error("Pairing for viewer {0} is closed")]
    PairingClosed(String),

    #[error("Invalid transition for viewer {viewer_id}: {operation} not allowed in {state}")]
    InvalidTransition {
        viewer_id: String,
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Room code generation errors
    #[error("Room code space exhausted after {0} attempts")]
    CodeSpaceExhausted(usize),

    /// Transport errors
    #[error("Transport error for session {0}")]
    Transport(String),

    #[error("Empty ICE candidate payload")]
    EmptyCandidate,

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Convenience type alias for Results using SignalError
pub type Result<T> = std::result::Result<T, SignalError>;

impl SignalError {
    /// Stable machine-readable code carried on wire `error` messages.
    /// Every failure kind is distinguishable to the client; there is no
    /// generic catch-all code.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalError::RoomNotFound(_) => "room_not_found",
            SignalError::SessionNotFound(_) => "session_not_found",
            SignalError::InvalidRoomCode(_) => "invalid_room_code",
            SignalError::RoomAlreadyOccupied(_) => "room_already_occupied",
            SignalError::SharerNotAvailable(_) => "sharer_not_available",
            SignalError::PeerUnavailable(_) => "peer_unavailable",
            SignalError::PairingClosed(_) => "pairing_closed",
            SignalError::InvalidTransition { .. } => "invalid_transition",
            SignalError::InvariantViolation(_) => "invariant_violation",
            SignalError::CodeSpaceExhausted(_) => "code_space_exhausted",
            SignalError::Transport(_) => "transport_error",
            SignalError::EmptyCandidate => "empty_candidate",
            SignalError::SerializationFailed(_) => "bad_message",
        }
    }

    /// Helper to create invariant violations with context
    pub fn invariant(msg: impl Into<String>) -> Self {
        SignalError::InvariantViolation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SignalError::RoomNotFound("ZZ9999".to_string());
        assert_eq!(err.to_string(), "Room ZZ9999 not found");
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            SignalError::RoomNotFound("A".into()),
            SignalError::SessionNotFound("A".into()),
            SignalError::InvalidRoomCode("A".into()),
            SignalError::RoomAlreadyOccupied("A".into()),
            SignalError::SharerNotAvailable("A".into()),
            SignalError::PeerUnavailable("A".into()),
            SignalError::PairingClosed("A".into()),
            SignalError::InvariantViolation("A".into()),
            SignalError::CodeSpaceExhausted(5),
            SignalError::Transport("A".into()),
            SignalError::EmptyCandidate,
        ];

        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(
            kinds.len(),
            errors.len(),
            "every failure must map to its own wire code"
        );
    }

    #[test]
    fn test_invariant_helper() {
        let err = SignalError::invariant("viewer count underflow");
        assert!(matches!(err, SignalError::InvariantViolation(_)));
        assert_eq!(err.kind(), "invariant_violation");
    }
}
