use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, SignalError};

/// Durable (per-process) room row. Lifecycle state only; the store never
/// references session objects, just the aggregate count and sharer id.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub is_active: bool,
    pub sharer_id: Option<String>,
    pub viewer_count: u32,
}

/// Serializable view of a room for the admin listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_code: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub is_active: bool,
    pub sharer_id: Option<String>,
    pub viewer_count: u32,
}

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Room {
    fn new(code: &str) -> Self {
        let now = SystemTime::now();
        Self {
            code: code.to_string(),
            created_at: now,
            updated_at: now,
            is_active: false,
            sharer_id: None,
            viewer_count: 0,
        }
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.code.clone(),
            created_at: epoch_millis(self.created_at),
            updated_at: epoch_millis(self.updated_at),
            is_active: self.is_active,
            sharer_id: self.sharer_id.clone(),
            viewer_count: self.viewer_count,
        }
    }
}

/// Room metadata store. Every mutation is a whole-method critical section
/// under one write lock, so no partial update is ever visible to readers.
pub struct RoomStore {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_room(&self, code: &str) -> Result<Room> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return Err(SignalError::invariant(format!(
                "room {} already exists in store",
                code
            )));
        }

        let room = Room::new(code);
        rooms.insert(code.to_string(), room.clone());

        tracing::info!(room_code = %code, "Room created");
        Ok(room)
    }

    pub async fn get_room(&self, code: &str) -> Option<Room> {
        let rooms = self.rooms.read().await;
        rooms.get(code).cloned()
    }

    /// Set the room's active flag and sharer id. Deactivation clears the
    /// sharer unless the caller supplies a replacement.
    pub async fn set_active(
        &self,
        code: &str,
        is_active: bool,
        sharer_id: Option<String>,
    ) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(code)
            .ok_or_else(|| SignalError::RoomNotFound(code.to_string()))?;

        room.is_active = is_active;
        room.sharer_id = sharer_id;
        room.updated_at = SystemTime::now();

        tracing::info!(
            room_code = %code,
            is_active = is_active,
            sharer_id = ?room.sharer_id,
            "Room activity updated"
        );
        Ok(())
    }

    /// Apply `delta` to the viewer count. The count never goes negative:
    /// an underflow attempt clamps to zero and reports `InvariantViolation`,
    /// which indicates a bookkeeping bug upstream.
    pub async fn adjust_viewer_count(&self, code: &str, delta: i64) -> Result<u32> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(code)
            .ok_or_else(|| SignalError::RoomNotFound(code.to_string()))?;

        let proposed = room.viewer_count as i64 + delta;
        room.updated_at = SystemTime::now();

        if proposed < 0 {
            let previous = room.viewer_count;
            room.viewer_count = 0;
            tracing::error!(
                room_code = %code,
                previous = previous,
                delta = delta,
                "Viewer count underflow attempted, clamping to zero"
            );
            return Err(SignalError::invariant(format!(
                "viewer count underflow in room {}: {} + {}",
                code, previous, delta
            )));
        }

        room.viewer_count = proposed as u32;
        tracing::debug!(
            room_code = %code,
            viewer_count = room.viewer_count,
            "Viewer count updated"
        );
        Ok(room.viewer_count)
    }

    /// All rooms, newest first
    pub async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.read().await;
        let mut all: Vec<Room> = rooms.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Explicit administrative deletion; rooms are never deleted by the
    /// signaling paths themselves.
    pub async fn delete_room(&self, code: &str) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        if rooms.remove(code).is_none() {
            return Err(SignalError::RoomNotFound(code.to_string()));
        }
        tracing::info!(room_code = %code, "Room deleted");
        Ok(())
    }
}
