//! Snapshot building for network transmission

use crate::ws::protocol::{PlayerSnapshot, RoomSnapshot, ServerMsg};

use super::physics::{ARENA_HEIGHT, ARENA_WIDTH};
use super::room::Room;

/// Builds full-state snapshots. Every snapshot replaces the previous one,
/// so a client that misses one just renders the next.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(room: &Room) -> ServerMsg {
        let players = room
            .players
            .values()
            .map(|p| PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                class: p.class,
                color: p.color.clone(),
                x: p.x,
                y: p.y,
                aim_x: p.aim_x,
                aim_y: p.aim_y,
                hp: p.hp,
                max: p.max_hp,
                alive: p.alive,
                kills: p.kills,
                cooldown: p.fire_cooldown,
            })
            .collect();

        ServerMsg::State(RoomSnapshot {
            room: room.id.clone(),
            tick: room.tick,
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            close: room.close,
            door: room.door.clone(),
            players,
            enemies: room.enemies.clone(),
            bullets: room.bullets.clone(),
            pickups: room.pickups.clone(),
            result: room.outcome,
        })
    }

    /// Serialize once so the same frame can be fanned out to every connection
    pub fn encode(room: &Room) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Self::build(room))
    }
}
