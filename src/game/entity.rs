//! Entity model - the plain data every room is made of

use serde::Serialize;
use uuid::Uuid;

use crate::ws::protocol::{PlayerClass, DEFAULT_COLOR};

use super::physics::{ClassStats, PhysicsSystem};

/// Opaque player identity handed out on join
pub type PlayerId = Uuid;

/// A participant in a room (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub class: PlayerClass,
    /// CSS hex colour the client renders this player in
    pub color: String,

    // Position and intent
    pub x: f32,
    pub y: f32,
    pub ix: f32,
    pub iy: f32,
    pub aim_x: f32,
    pub aim_y: f32,

    // Combat
    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,
    pub kills: u32,
    pub fire_cooldown: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, class: PlayerClass, x: f32, y: f32) -> Self {
        let stats = ClassStats::for_class(class);
        Self {
            id,
            name,
            class,
            color: DEFAULT_COLOR.to_string(),
            x,
            y,
            ix: 0.0,
            iy: 0.0,
            aim_x: 1.0,
            aim_y: 0.0,
            hp: stats.max_health,
            max_hp: stats.max_health,
            alive: true,
            kills: 0,
            fire_cooldown: 0,
        }
    }

    /// Subtract health, keeping `alive == (hp > 0)`.
    /// Returns true if this damage killed the player.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.alive {
            return false;
        }
        self.hp = (self.hp - amount).max(0.0);
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.alive = false;
            return true;
        }
        false
    }

    /// Restore health, capped at max. Dead players stay dead.
    pub fn heal(&mut self, amount: f32) {
        if self.alive {
            self.hp = (self.hp + amount).min(self.max_hp);
        }
    }

    /// Back to a fresh spawn: full health, no kills, no pending intent
    pub fn respawn(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.ix = 0.0;
        self.iy = 0.0;
        self.hp = self.max_hp;
        self.alive = true;
        self.kills = 0;
        self.fire_cooldown = 0;
    }

    pub fn distance_sq_to(&self, x: f32, y: f32) -> f32 {
        PhysicsSystem::distance_sq(self.x, self.y, x, y)
    }
}

/// Hostile entity chasing the nearest living player
#[derive(Debug, Clone, Serialize)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    /// Ticks until the next ranged attack
    pub cooldown: u32,
    pub vx: f32,
    pub vy: f32,
}

impl Enemy {
    pub fn new(x: f32, y: f32, hp: f32) -> Self {
        Self {
            x,
            y,
            hp,
            cooldown: 0,
            vx: 0.0,
            vy: 0.0,
        }
    }
}

/// Who fired a bullet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletOwner {
    Hostile,
    Player(PlayerId),
}

#[derive(Debug, Clone, Serialize)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining lifetime in ticks
    pub life: u32,
    pub owner: BulletOwner,
}

/// Health pack lying on the floor
#[derive(Debug, Clone, Serialize)]
pub struct Pickup {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Exit objective. `open` only ever goes false -> true within a session.
#[derive(Debug, Clone, Serialize)]
pub struct Door {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub open: bool,
}

impl Door {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        PhysicsSystem::within(self.x, self.y, x, y, self.radius)
    }
}

/// Final outcome of a room, sticky until reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Lose,
    Win { winner: PlayerId },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soldier() -> Player {
        Player::new(Uuid::new_v4(), "Ada".to_string(), PlayerClass::Soldier, 500.0, 500.0)
    }

    #[test]
    fn new_player_has_full_class_health() {
        let p = soldier();
        assert_eq!(p.hp, 110.0);
        assert_eq!(p.max_hp, 110.0);
        assert!(p.alive);
        assert_eq!(p.kills, 0);

        let tank = Player::new(Uuid::new_v4(), "T".to_string(), PlayerClass::Tank, 0.0, 0.0);
        assert!(tank.max_hp > p.max_hp);
    }

    #[test]
    fn lethal_damage_clamps_to_zero_and_kills() {
        let mut p = soldier();
        assert!(!p.apply_damage(100.0));
        assert!(p.alive);
        assert!(p.apply_damage(50.0));
        assert_eq!(p.hp, 0.0);
        assert!(!p.alive);

        // Already dead: nothing changes, no second kill reported
        assert!(!p.apply_damage(10.0));
        assert_eq!(p.hp, 0.0);
    }

    #[test]
    fn heal_caps_at_max_and_ignores_dead() {
        let mut p = soldier();
        p.apply_damage(20.0);
        p.heal(40.0);
        assert_eq!(p.hp, p.max_hp);

        p.apply_damage(1000.0);
        p.heal(40.0);
        assert_eq!(p.hp, 0.0);
        assert!(!p.alive);
    }

    #[test]
    fn respawn_restores_player() {
        let mut p = soldier();
        p.kills = 4;
        p.ix = 1.0;
        p.fire_cooldown = 3;
        p.apply_damage(500.0);

        p.respawn(450.0, 550.0);
        assert!(p.alive);
        assert_eq!(p.hp, p.max_hp);
        assert_eq!(p.kills, 0);
        assert_eq!((p.x, p.y), (450.0, 550.0));
        assert_eq!((p.ix, p.fire_cooldown), (0.0, 0));
    }

    #[test]
    fn outcome_wire_shape() {
        let id = Uuid::nil();
        let win = serde_json::to_value(Outcome::Win { winner: id }).unwrap();
        assert_eq!(win["kind"], "win");
        assert_eq!(win["winner"], id.to_string());
        assert_eq!(serde_json::to_value(Outcome::Lose).unwrap()["kind"], "lose");
    }
}
