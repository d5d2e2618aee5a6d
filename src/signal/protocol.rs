use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Participant role within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sharer,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sharer => "sharer",
            Role::Viewer => "viewer",
        }
    }
}

/// Messages sent by clients over the signaling channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sharer: mint a fresh room and attach to it
    CreateRoom {},

    /// Attach to an existing room by code
    Join { room_code: String, role: Role },

    /// Viewer: SDP offer for the room's sharer
    Offer { sdp: String },

    /// Sharer: SDP answer routed back to the originating viewer
    Answer { viewer_id: String, sdp: String },

    /// ICE candidate from either side. Sharers must address a viewer;
    /// viewers leave `viewer_id` unset.
    Ice {
        #[serde(default)]
        viewer_id: Option<String>,
        candidate: String,
        #[serde(default)]
        sdp_mid: Option<String>,
        #[serde(default)]
        sdp_mline_index: Option<u16>,
    },

    /// First track/connection event observed by either side
    Established {
        #[serde(default)]
        viewer_id: Option<String>,
    },

    /// Explicit teardown, same path as a transport close
    Leave {},

    /// Heartbeat
    Ping {},
}

/// Messages sent by the server over the signaling channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room_code: String,
        session_id: String,
    },

    /// For a viewer this is also the cue to send an offer
    Joined {
        room_code: String,
        session_id: String,
        role: Role,
    },

    Offer {
        viewer_id: String,
        sdp: String,
    },

    Answer {
        sdp: String,
    },

    Ice {
        from: String,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },

    PeerLeft {
        session_id: String,
        role: Role,
    },

    Pong {},

    Error {
        kind: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(err: &SignalError) -> Self {
        ServerMessage::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_round_trip_tag() {
        let json = r#"{"type":"join","room_code":"AB12C3","role":"viewer"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Join { room_code, role } => {
                assert_eq!(room_code, "AB12C3");
                assert_eq!(role, Role::Viewer);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_ice_optional_fields() {
        let json = r#"{"type":"ice","viewer_id":null,"candidate":"candidate:1 1 udp 2122260223 192.0.2.1 54400 typ host","sdp_mid":"0","sdp_mline_index":0}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Ice {
                viewer_id,
                sdp_mline_index,
                ..
            } => {
                assert!(viewer_id.is_none());
                assert_eq!(sdp_mline_index, Some(0));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_error_message_carries_kind() {
        let err = SignalError::SharerNotAvailable("AB12C3".to_string());
        let msg = ServerMessage::error(&err);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "sharer_not_available");
    }

    #[test]
    fn test_server_message_snake_case_tags() {
        let msg = ServerMessage::PeerLeft {
            session_id: "s1".to_string(),
            role: Role::Sharer,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "peer_left");
        assert_eq!(json["role"], "sharer");
    }
}
