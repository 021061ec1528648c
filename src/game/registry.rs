//! Registry of live rooms keyed by room id

use std::collections::HashMap;
use tracing::info;

use super::room::{Room, RoomId};

/// Owns every room. Only the engine task touches it, so rooms are never
/// mutated concurrently.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    /// Fetch a room, creating it with a fresh seed on first use
    pub fn get_or_create(&mut self, id: &str) -> &mut Room {
        self.rooms.entry(id.to_string()).or_insert_with(|| {
            info!(room_id = %id, "Room created");
            Room::new(id.to_string(), rand::random())
        })
    }

    pub fn remove(&mut self, id: &str) -> Option<Room> {
        let room = self.rooms.remove(id);
        if room.is_some() {
            info!(room_id = %id, "Room destroyed");
        }
        room
    }

    pub fn rooms_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.values().map(|r| r.players.len()).sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{PlayerClass, DEFAULT_COLOR};

    #[test]
    fn get_or_create_is_idempotent() {
        let mut registry = RoomRegistry::new();
        let id = registry.get_or_create("alpha").join(
            1,
            "a".into(),
            PlayerClass::Soldier,
            DEFAULT_COLOR.into(),
        );
        registry.get_or_create("alpha");

        assert_eq!(registry.active_rooms(), 1);
        assert!(registry.get("alpha").unwrap().players.contains_key(&id));
        assert_eq!(registry.total_players(), 1);
    }

    #[test]
    fn rooms_do_not_share_entities() {
        let mut registry = RoomRegistry::new();
        registry
            .get_or_create("a")
            .join(1, "a".into(), PlayerClass::Soldier, DEFAULT_COLOR.into());
        registry.get_or_create("b");

        assert_eq!(registry.active_rooms(), 2);
        assert!(registry.get("b").unwrap().players.is_empty());
    }

    #[test]
    fn remove_destroys_room() {
        let mut registry = RoomRegistry::new();
        registry.get_or_create("a");
        assert!(registry.remove("a").is_some());
        assert!(registry.get("a").is_none());
        assert!(registry.remove("a").is_none());
    }
}
