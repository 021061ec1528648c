//! Room state and the per-room fixed-step simulation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::util::time::TICK_MILLIS;
use crate::ws::protocol::PlayerClass;

use super::combat::{CombatSystem, ENEMY_HEALTH};
use super::entity::{Bullet, Door, Enemy, Outcome, Pickup, Player, PlayerId};
use super::physics::{PhysicsSystem, ARENA_HEIGHT, ARENA_WIDTH};

/// Caller-supplied room name
pub type RoomId = String;

/// Process-local handle for one network connection
pub type ConnectionId = u64;

// Zone
pub const ZONE_GRACE_MS: u64 = 15_000;
pub const ZONE_STEP: f32 = 0.2;
pub const ZONE_MAX: f32 = 480.0;
pub const HAZARD_DAMAGE: f32 = 0.8;

// Spawning
pub const ENEMY_SPAWN_INTERVAL_MS: u64 = 1_600;
pub const ENEMY_SPAWN_MARGIN: f32 = 50.0;
pub const MAX_ENEMIES: usize = 40;
pub const PICKUP_SPAWN_INTERVAL_MS: u64 = 5_000;
pub const MAX_PICKUPS: usize = 8;
pub const PICKUP_RADIUS: f32 = 25.0;
pub const PICKUP_HEAL: f32 = 40.0;
pub const PICKUP_AREA_X: (f32, f32) = (300.0, 1500.0);
pub const PICKUP_AREA_Y: (f32, f32) = (300.0, 700.0);
pub const PLAYER_SPAWN_MIN: f32 = 400.0;
pub const PLAYER_SPAWN_MAX: f32 = 600.0;

// Objective
pub const KILL_THRESHOLD: u32 = 5;
pub const DOOR_RADIUS: f32 = 40.0;

/// Minimum aim vector length accepted from clients
const AIM_EPSILON: f32 = 1e-3;

/// One arena instance. Timestamps are milliseconds on the room's own
/// simulation clock, which only advances while the room ticks.
pub struct Room {
    pub id: RoomId,
    pub players: HashMap<PlayerId, Player>,
    pub bullets: Vec<Bullet>,
    pub enemies: Vec<Enemy>,
    pub pickups: Vec<Pickup>,
    pub close: f32,
    pub door: Door,
    pub outcome: Option<Outcome>,
    pub tick: u64,
    pub clock_ms: u64,
    pub started_at: u64,
    pub last_enemy_spawn: u64,
    pub last_pickup_spawn: u64,
    connections: HashSet<ConnectionId>,
    rng: ChaCha8Rng,
}

impl Room {
    pub fn new(id: RoomId, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let door = random_door(&mut rng);
        Self {
            id,
            players: HashMap::new(),
            bullets: Vec::new(),
            enemies: Vec::new(),
            pickups: Vec::new(),
            close: 0.0,
            door,
            outcome: None,
            tick: 0,
            clock_ms: 0,
            started_at: 0,
            last_enemy_spawn: 0,
            last_pickup_spawn: 0,
            connections: HashSet::new(),
            rng,
        }
    }

    /// Bind a connection and create its player at a random safe spot
    pub fn join(
        &mut self,
        conn_id: ConnectionId,
        name: String,
        class: PlayerClass,
        color: String,
    ) -> PlayerId {
        let id = PlayerId::new_v4();
        let (x, y) = self.random_player_spawn();
        let mut player = Player::new(id, name, class, x, y);
        player.color = color;
        self.players.insert(id, player);
        self.connections.insert(conn_id);
        id
    }

    /// Unbind a connection and drop its player
    pub fn leave(&mut self, conn_id: ConnectionId, player_id: &PlayerId) {
        self.players.remove(player_id);
        self.connections.remove(&conn_id);
    }

    /// No connection is bound any more
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.connections.iter()
    }

    /// Store movement/aim intent. Returns false if the player is gone.
    pub fn apply_input(&mut self, player_id: &PlayerId, ix: f32, iy: f32, aim: Option<(f32, f32)>) -> bool {
        let Some(player) = self.players.get_mut(player_id) else {
            return false;
        };

        player.ix = clamp_axis(ix);
        player.iy = clamp_axis(iy);

        if let Some((ax, ay)) = aim {
            let len = ax.hypot(ay);
            if len.is_finite() && len > AIM_EPSILON {
                player.aim_x = ax / len;
                player.aim_y = ay / len;
            }
        }
        true
    }

    /// Try to fire for a player. Returns true if a bullet was spawned.
    pub fn shoot(&mut self, player_id: &PlayerId) -> bool {
        let Some(player) = self.players.get_mut(player_id) else {
            return false;
        };
        match CombatSystem::try_fire(player) {
            Some(bullet) => {
                self.bullets.push(bullet);
                true
            }
            None => false,
        }
    }

    /// Back to the just-created state, keeping every joined player
    pub fn reset(&mut self) {
        self.bullets.clear();
        self.enemies.clear();
        self.pickups.clear();
        self.close = 0.0;
        self.door = random_door(&mut self.rng);
        self.outcome = None;
        self.started_at = self.clock_ms;
        self.last_enemy_spawn = self.clock_ms;
        self.last_pickup_spawn = self.clock_ms;

        // Stable draw order keeps spawns reproducible from the seed
        let mut ids: Vec<PlayerId> = self.players.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let (x, y) = self.random_player_spawn();
            if let Some(player) = self.players.get_mut(&id) {
                player.respawn(x, y);
            }
        }
    }

    /// Run one simulation step. Returns false when the room has no players
    /// and the tick was skipped.
    pub fn tick(&mut self) -> bool {
        if self.players.is_empty() {
            return false;
        }

        self.tick += 1;
        self.clock_ms += TICK_MILLIS;

        self.update_zone();
        self.update_spawns();
        self.update_players();
        self.update_door();
        CombatSystem::update_enemies(&mut self.enemies, &mut self.players, &mut self.bullets);
        CombatSystem::update_bullets(&mut self.bullets, &mut self.enemies, &mut self.players);
        self.update_pickups();
        self.update_outcome();

        true
    }

    fn update_zone(&mut self) {
        if self.clock_ms.saturating_sub(self.started_at) >= ZONE_GRACE_MS {
            self.close = (self.close + ZONE_STEP).min(ZONE_MAX);
        }
    }

    fn update_spawns(&mut self) {
        if self.clock_ms.saturating_sub(self.last_enemy_spawn) >= ENEMY_SPAWN_INTERVAL_MS {
            self.last_enemy_spawn = self.clock_ms;
            if self.enemies.len() < MAX_ENEMIES {
                let inset = self.close + ENEMY_SPAWN_MARGIN;
                let x = sample(&mut self.rng, inset, ARENA_WIDTH - inset);
                let y = sample(&mut self.rng, inset, ARENA_HEIGHT - inset);
                self.enemies.push(Enemy::new(x, y, ENEMY_HEALTH));
            }
        }

        if self.clock_ms.saturating_sub(self.last_pickup_spawn) >= PICKUP_SPAWN_INTERVAL_MS {
            self.last_pickup_spawn = self.clock_ms;
            if self.pickups.len() < MAX_PICKUPS {
                let x = self.rng.gen_range(PICKUP_AREA_X.0..PICKUP_AREA_X.1);
                let y = self.rng.gen_range(PICKUP_AREA_Y.0..PICKUP_AREA_Y.1);
                self.pickups.push(Pickup {
                    x,
                    y,
                    radius: PICKUP_RADIUS,
                });
            }
        }
    }

    fn update_players(&mut self) {
        let close = self.close;
        for player in self.players.values_mut() {
            player.fire_cooldown = player.fire_cooldown.saturating_sub(1);
            if !player.alive {
                continue;
            }

            PhysicsSystem::move_player(player);

            if PhysicsSystem::in_hazard(player.x, player.y, close) {
                player.apply_damage(HAZARD_DAMAGE);
            }
        }
    }

    fn update_door(&mut self) {
        if !self.door.open && self.players.values().any(|p| p.kills >= KILL_THRESHOLD) {
            self.door.open = true;
            info!(room_id = %self.id, tick = self.tick, "Door opened");
        }
    }

    fn update_pickups(&mut self) {
        let players = &mut self.players;
        self.pickups.retain(|pickup| {
            let taker = players.values_mut().find(|p| {
                p.alive && PhysicsSystem::within(pickup.x, pickup.y, p.x, p.y, pickup.radius)
            });
            match taker {
                Some(player) => {
                    player.heal(PICKUP_HEAL);
                    false
                }
                None => true,
            }
        });
    }

    fn update_outcome(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        if let Some(outcome) = self.evaluate_outcome() {
            info!(room_id = %self.id, tick = self.tick, ?outcome, "Room finished");
            self.outcome = Some(outcome);
        }
    }

    /// Outcome implied by the current state, ignoring any earlier result
    pub fn evaluate_outcome(&self) -> Option<Outcome> {
        let alive: Vec<&Player> = self.players.values().filter(|p| p.alive).collect();
        if alive.is_empty() {
            return Some(Outcome::Lose);
        }

        if self.door.open && alive.iter().all(|p| self.door.contains(p.x, p.y)) {
            // First found wins ties
            let mut winner = alive[0];
            for &p in &alive[1..] {
                if p.kills > winner.kills {
                    winner = p;
                }
            }
            return Some(Outcome::Win { winner: winner.id });
        }

        if self.close >= ZONE_MAX {
            return Some(Outcome::Lose);
        }

        None
    }

    fn random_player_spawn(&mut self) -> (f32, f32) {
        (
            self.rng.gen_range(PLAYER_SPAWN_MIN..PLAYER_SPAWN_MAX),
            self.rng.gen_range(PLAYER_SPAWN_MIN..PLAYER_SPAWN_MAX),
        )
    }
}

fn random_door(rng: &mut ChaCha8Rng) -> Door {
    Door {
        x: rng.gen_range(400.0..1400.0),
        y: rng.gen_range(300.0..700.0),
        radius: DOOR_RADIUS,
        open: false,
    }
}

/// Uniform in `lo..hi`, collapsing to the midpoint when the range is empty
fn sample(rng: &mut ChaCha8Rng, lo: f32, hi: f32) -> f32 {
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        (lo + hi) / 2.0
    }
}

fn clamp_axis(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}
