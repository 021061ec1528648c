//! Arena geometry, player movement and hazard checks

use crate::ws::protocol::PlayerClass;

use super::entity::Player;

/// Arena extents
pub const ARENA_WIDTH: f32 = 1800.0;
pub const ARENA_HEIGHT: f32 = 1000.0;

/// Movement and health constants per class
#[derive(Debug, Clone, Copy)]
pub struct ClassStats {
    /// Distance covered per tick at full intent
    pub speed: f32,
    /// Maximum health
    pub max_health: f32,
}

impl ClassStats {
    pub fn for_class(class: PlayerClass) -> Self {
        match class {
            PlayerClass::Soldier => Self {
                speed: 7.0,
                max_health: 110.0,
            },
            PlayerClass::Tank => Self {
                speed: 5.0,
                max_health: 170.0,
            },
        }
    }
}

pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Scale an intent vector down to unit length if it is longer than 1
    pub fn normalize_intent(ix: f32, iy: f32) -> (f32, f32) {
        let len = (ix * ix + iy * iy).sqrt();
        if len > 1.0 {
            (ix / len, iy / len)
        } else {
            (ix, iy)
        }
    }

    /// Advance a living player along its intent and keep it inside the arena
    pub fn move_player(player: &mut Player) {
        let stats = ClassStats::for_class(player.class);
        let (ix, iy) = Self::normalize_intent(player.ix, player.iy);
        player.x = (player.x + ix * stats.speed).clamp(0.0, ARENA_WIDTH);
        player.y = (player.y + iy * stats.speed).clamp(0.0, ARENA_HEIGHT);
    }

    /// Outside the `[close, w-close] x [close, h-close]` safe rectangle
    pub fn in_hazard(x: f32, y: f32, close: f32) -> bool {
        x < close || y < close || x > ARENA_WIDTH - close || y > ARENA_HEIGHT - close
    }

    pub fn in_bounds(x: f32, y: f32) -> bool {
        (0.0..=ARENA_WIDTH).contains(&x) && (0.0..=ARENA_HEIGHT).contains(&y)
    }

    pub fn distance_sq(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        dx * dx + dy * dy
    }

    /// Strictly closer than `radius`
    pub fn within(x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) -> bool {
        Self::distance_sq(x1, y1, x2, y2) < radius * radius
    }

    /// Unit vector from (x1, y1) towards (x2, y2), with its length.
    /// Coincident points yield a zero vector.
    pub fn direction(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32) {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let len = (dx * dx + dy * dy).sqrt();
        if len < f32::EPSILON {
            return (0.0, 0.0, 0.0);
        }
        (dx / len, dy / len, len)
    }
}
