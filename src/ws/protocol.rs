//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::entity::{Bullet, Door, Enemy, Outcome, Pickup, PlayerId};

/// Longest accepted room id, in chars
pub const MAX_ROOM_LEN: usize = 24;
/// Longest accepted display name, in chars
pub const MAX_NAME_LEN: usize = 14;
pub const DEFAULT_ROOM: &str = "solo";
pub const DEFAULT_NAME: &str = "Player";
pub const DEFAULT_COLOR: &str = "#22c55e";

/// Player classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerClass {
    /// Fast, lighter armour
    #[default]
    Soldier,
    /// Slow but tough
    Tank,
}

impl PlayerClass {
    /// `"tank"` selects the tank, anything else is a soldier
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("tank") => Self::Tank,
            _ => Self::Soldier,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter a room, creating it if needed
    Join {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        class: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },

    /// Movement and aim intent
    Input {
        ix: f32,
        iy: f32,
        #[serde(default, rename = "aimX")]
        aim_x: Option<f32>,
        #[serde(default, rename = "aimY")]
        aim_y: Option<f32>,
    },

    /// Attempt to fire
    Shoot,

    /// Reinitialize the room, keeping everyone in it
    Reset,
}

/// A validated join request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room: String,
    pub name: String,
    pub class: PlayerClass,
    pub color: String,
}

impl JoinRequest {
    pub fn resolve(
        room: Option<String>,
        name: Option<String>,
        class: Option<String>,
        color: Option<String>,
    ) -> Self {
        Self {
            room: bounded(room, MAX_ROOM_LEN, DEFAULT_ROOM),
            name: bounded(name, MAX_NAME_LEN, DEFAULT_NAME),
            class: PlayerClass::from_tag(class.as_deref()),
            color: hex_color(color),
        }
    }
}

/// Accept `#rgb` or `#rrggbb`, anything else gets the default colour
fn hex_color(value: Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(c)
            if matches!(c.len(), 4 | 7)
                && c.starts_with('#')
                && c[1..].chars().all(|ch| ch.is_ascii_hexdigit()) =>
        {
            c.to_string()
        }
        _ => DEFAULT_COLOR.to_string(),
    }
}

/// Trim, truncate to `max` chars, fall back when blank
fn bounded(value: Option<String>, max: usize, fallback: &str) -> String {
    let trimmed: String = value
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(max)
        .collect();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed
    }
}

/// Inbound message errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse a text frame into a client message
pub fn parse_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Identity assignment after a successful join
    You { id: PlayerId, room: String },

    /// Full room state, once per tick
    State(RoomSnapshot),
}

/// Complete visible state of one room
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room: String,
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    /// Hazard border thickness
    pub close: f32,
    pub door: Door,
    pub players: Vec<PlayerSnapshot>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub pickups: Vec<Pickup>,
    pub result: Option<Outcome>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub class: PlayerClass,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub aim_x: f32,
    pub aim_y: f32,
    pub hp: f32,
    pub max: f32,
    pub alive: bool,
    pub kills: u32,
    /// Ticks until the weapon is ready
    pub cooldown: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_message_kind() {
        let join = parse_client_msg(r#"{"type":"join","room":"r1","name":"Ada","class":"tank"}"#)
            .unwrap();
        assert!(matches!(join, ClientMsg::Join { room: Some(ref r), .. } if r == "r1"));

        let input = parse_client_msg(r#"{"type":"input","ix":0.5,"iy":-2,"aimX":1,"aimY":0}"#)
            .unwrap();
        match input {
            ClientMsg::Input { ix, iy, aim_x, aim_y } => {
                assert_eq!((ix, iy), (0.5, -2.0));
                assert_eq!((aim_x, aim_y), (Some(1.0), Some(0.0)));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(parse_client_msg(r#"{"type":"shoot"}"#).unwrap(), ClientMsg::Shoot));
        assert!(matches!(parse_client_msg(r#"{"type":"reset"}"#).unwrap(), ClientMsg::Reset));
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(parse_client_msg(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_client_msg(r#"{"ix":1}"#).is_err());
        assert!(parse_client_msg(r#"{"type":"input","ix":"left","iy":0}"#).is_err());
        assert!(parse_client_msg("not json").is_err());
    }

    #[test]
    fn join_defaults_and_bounds() {
        let req = JoinRequest::resolve(None, Some("   ".into()), Some("wizard".into()), None);
        assert_eq!(req.room, DEFAULT_ROOM);
        assert_eq!(req.name, DEFAULT_NAME);
        assert_eq!(req.class, PlayerClass::Soldier);
        assert_eq!(req.color, DEFAULT_COLOR);

        let req = JoinRequest::resolve(
            Some("a-very-long-room-name-that-goes-on".into()),
            Some("Maximilian the Great".into()),
            Some("tank".into()),
            Some(" #3b82f6 ".into()),
        );
        assert_eq!(req.room.chars().count(), MAX_ROOM_LEN);
        assert_eq!(req.name, "Maximilian the");
        assert_eq!(req.class, PlayerClass::Tank);
        assert_eq!(req.color, "#3b82f6");

        assert_eq!(JoinRequest::resolve(None, None, None, Some("#f0a".into())).color, "#f0a");
        for bad in ["red", "#12345", "#ggg", "#3b82f6; x", "", "#ééé"] {
            let req = JoinRequest::resolve(None, None, None, Some(bad.into()));
            assert_eq!(req.color, DEFAULT_COLOR, "{bad:?}");
        }
    }

    #[test]
    fn join_message_carries_color() {
        let join = parse_client_msg(r##"{"type":"join","color":"#ef4444"}"##).unwrap();
        assert!(matches!(join, ClientMsg::Join { color: Some(ref c), .. } if c == "#ef4444"));
    }

    #[test]
    fn you_message_shape() {
        let id = PlayerId::nil();
        let json = serde_json::to_value(ServerMsg::You { id, room: "solo".into() }).unwrap();
        assert_eq!(json["type"], "you");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["room"], "solo");
    }
}
