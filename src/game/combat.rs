//! Combat system - firing, enemy AI, bullet travel and hit detection

use std::collections::HashMap;

use crate::ws::protocol::PlayerClass;

use super::entity::{Bullet, BulletOwner, Enemy, Player, PlayerId};
use super::physics::PhysicsSystem;

/// Weapon stats per player class
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Bullet travel per tick
    pub bullet_speed: f32,
    /// Ticks between shots
    pub cooldown_ticks: u32,
}

impl WeaponStats {
    pub fn for_class(class: PlayerClass) -> Self {
        match class {
            PlayerClass::Soldier => Self {
                bullet_speed: 11.0,
                cooldown_ticks: 6,
            },
            PlayerClass::Tank => Self {
                bullet_speed: 9.0,
                cooldown_ticks: 10,
            },
        }
    }
}

// Player bullets
pub const MUZZLE_OFFSET: f32 = 18.0;
pub const PLAYER_BULLET_LIFE: u32 = 80;
pub const PLAYER_BULLET_DAMAGE: f32 = 30.0;
pub const ENEMY_HIT_RADIUS: f32 = 20.0;

// Enemies
pub const ENEMY_HEALTH: f32 = 60.0;
pub const ENEMY_STEP: f32 = 1.8;
pub const ENEMY_MELEE_RADIUS: f32 = 24.0;
pub const ENEMY_MELEE_DAMAGE: f32 = 0.6;
pub const ENEMY_RANGE: f32 = 300.0;
pub const ENEMY_FIRE_COOLDOWN: u32 = 35;
pub const ENEMY_BULLET_SPEED: f32 = 7.5;
pub const ENEMY_BULLET_LIFE: u32 = 90;
pub const ENEMY_BULLET_DAMAGE: f32 = 14.0;
pub const PLAYER_HIT_RADIUS: f32 = 18.0;

pub struct CombatSystem;

impl CombatSystem {
    /// Fire along the player's aim if alive and off cooldown
    pub fn try_fire(player: &mut Player) -> Option<Bullet> {
        if !player.alive || player.fire_cooldown > 0 {
            return None;
        }

        let weapon = WeaponStats::for_class(player.class);
        player.fire_cooldown = weapon.cooldown_ticks;

        Some(Bullet {
            x: player.x + player.aim_x * MUZZLE_OFFSET,
            y: player.y + player.aim_y * MUZZLE_OFFSET,
            vx: player.aim_x * weapon.bullet_speed,
            vy: player.aim_y * weapon.bullet_speed,
            life: PLAYER_BULLET_LIFE,
            owner: BulletOwner::Player(player.id),
        })
    }

    /// Closest living player by squared distance
    pub fn nearest_alive(players: &HashMap<PlayerId, Player>, x: f32, y: f32) -> Option<PlayerId> {
        players
            .values()
            .filter(|p| p.alive)
            .map(|p| (p.id, p.distance_sq_to(x, y)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Chase, melee and shoot at the nearest living player
    pub fn update_enemies(
        enemies: &mut [Enemy],
        players: &mut HashMap<PlayerId, Player>,
        bullets: &mut Vec<Bullet>,
    ) {
        for enemy in enemies.iter_mut() {
            let Some(target_id) = Self::nearest_alive(players, enemy.x, enemy.y) else {
                enemy.vx = 0.0;
                enemy.vy = 0.0;
                continue;
            };
            let Some(target) = players.get_mut(&target_id) else {
                continue;
            };

            let (dx, dy, dist) = PhysicsSystem::direction(enemy.x, enemy.y, target.x, target.y);
            let step = ENEMY_STEP.min(dist);
            enemy.vx = dx * step;
            enemy.vy = dy * step;
            enemy.x += enemy.vx;
            enemy.y += enemy.vy;

            if PhysicsSystem::within(enemy.x, enemy.y, target.x, target.y, ENEMY_MELEE_RADIUS) {
                target.apply_damage(ENEMY_MELEE_DAMAGE);
            }

            enemy.cooldown = enemy.cooldown.saturating_sub(1);

            if target.alive
                && enemy.cooldown == 0
                && PhysicsSystem::within(enemy.x, enemy.y, target.x, target.y, ENEMY_RANGE)
            {
                let (ax, ay, _) = PhysicsSystem::direction(enemy.x, enemy.y, target.x, target.y);
                bullets.push(Bullet {
                    x: enemy.x,
                    y: enemy.y,
                    vx: ax * ENEMY_BULLET_SPEED,
                    vy: ay * ENEMY_BULLET_SPEED,
                    life: ENEMY_BULLET_LIFE,
                    owner: BulletOwner::Hostile,
                });
                enemy.cooldown = ENEMY_FIRE_COOLDOWN;
            }
        }
    }

    /// Advance bullets, resolve at most one hit each, then drop spent bullets
    /// and dead enemies.
    pub fn update_bullets(
        bullets: &mut Vec<Bullet>,
        enemies: &mut Vec<Enemy>,
        players: &mut HashMap<PlayerId, Player>,
    ) {
        bullets.retain_mut(|bullet| {
            bullet.x += bullet.vx;
            bullet.y += bullet.vy;
            bullet.life = bullet.life.saturating_sub(1);

            if bullet.life == 0 || !PhysicsSystem::in_bounds(bullet.x, bullet.y) {
                return false;
            }

            match bullet.owner {
                BulletOwner::Hostile => {
                    let hit = players.values_mut().find(|p| {
                        p.alive
                            && PhysicsSystem::within(bullet.x, bullet.y, p.x, p.y, PLAYER_HIT_RADIUS)
                    });
                    match hit {
                        Some(player) => {
                            player.apply_damage(ENEMY_BULLET_DAMAGE);
                            false
                        }
                        None => true,
                    }
                }
                BulletOwner::Player(shooter_id) => {
                    let hit = enemies.iter_mut().find(|e| {
                        e.hp > 0.0
                            && PhysicsSystem::within(bullet.x, bullet.y, e.x, e.y, ENEMY_HIT_RADIUS)
                    });
                    match hit {
                        Some(enemy) => {
                            enemy.hp -= PLAYER_BULLET_DAMAGE;
                            if enemy.hp <= 0.0 {
                                if let Some(shooter) = players.get_mut(&shooter_id) {
                                    shooter.kills += 1;
                                }
                            }
                            false
                        }
                        None => true,
                    }
                }
            }
        });

        enemies.retain(|e| e.hp > 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(Uuid::new_v4(), "p".into(), PlayerClass::Soldier, x, y)
    }

    fn roster(list: Vec<Player>) -> HashMap<PlayerId, Player> {
        list.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn fire_respects_cooldown_and_alive() {
        let mut p = player_at(500.0, 500.0);
        p.aim_x = 0.0;
        p.aim_y = 1.0;

        let bullet = CombatSystem::try_fire(&mut p).expect("first shot fires");
        assert_eq!((bullet.x, bullet.y), (500.0, 500.0 + MUZZLE_OFFSET));
        assert_eq!(bullet.vy, WeaponStats::for_class(PlayerClass::Soldier).bullet_speed);
        assert_eq!(bullet.owner, BulletOwner::Player(p.id));
        assert_eq!(p.fire_cooldown, 6);

        assert!(CombatSystem::try_fire(&mut p).is_none());

        p.fire_cooldown = 0;
        p.apply_damage(1000.0);
        assert!(CombatSystem::try_fire(&mut p).is_none());
    }

    #[test]
    fn enemy_targets_nearest_living_player() {
        let near = player_at(110.0, 100.0);
        let mut dead = player_at(101.0, 100.0);
        dead.apply_damage(1000.0);
        let far = player_at(900.0, 100.0);
        let near_id = near.id;
        let players = roster(vec![near, dead, far]);

        assert_eq!(CombatSystem::nearest_alive(&players, 100.0, 100.0), Some(near_id));
        assert_eq!(CombatSystem::nearest_alive(&HashMap::new(), 0.0, 0.0), None);
    }

    #[test]
    fn enemy_steps_toward_target_and_fires_in_range() {
        let mut players = roster(vec![player_at(300.0, 100.0)]);
        let mut enemies = vec![Enemy::new(100.0, 100.0, ENEMY_HEALTH)];
        let mut bullets = Vec::new();

        CombatSystem::update_enemies(&mut enemies, &mut players, &mut bullets);

        assert!((enemies[0].x - (100.0 + ENEMY_STEP)).abs() < 1e-4);
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].owner, BulletOwner::Hostile);
        assert!(bullets[0].vx > 0.0);
        assert_eq!(enemies[0].cooldown, ENEMY_FIRE_COOLDOWN);

        // Cooling down: no second bullet next tick
        CombatSystem::update_enemies(&mut enemies, &mut players, &mut bullets);
        assert_eq!(bullets.len(), 1);
    }

    #[test]
    fn enemy_without_target_stays_put() {
        let mut players = HashMap::new();
        let mut enemies = vec![Enemy::new(100.0, 100.0, ENEMY_HEALTH)];
        let mut bullets = Vec::new();

        CombatSystem::update_enemies(&mut enemies, &mut players, &mut bullets);
        assert_eq!((enemies[0].x, enemies[0].y), (100.0, 100.0));
        assert!(bullets.is_empty());
    }

    #[test]
    fn melee_damages_adjacent_target() {
        let p = player_at(105.0, 100.0);
        let id = p.id;
        let mut players = roster(vec![p]);
        let mut enemies = vec![Enemy::new(100.0, 100.0, ENEMY_HEALTH)];
        enemies[0].cooldown = 10;
        let mut bullets = Vec::new();

        CombatSystem::update_enemies(&mut enemies, &mut players, &mut bullets);
        assert!((players[&id].hp - (110.0 - ENEMY_MELEE_DAMAGE)).abs() < 1e-4);
    }

    #[test]
    fn player_bullet_hits_enemy_once_and_is_removed() {
        let shooter = player_at(500.0, 500.0);
        let shooter_id = shooter.id;
        let mut players = roster(vec![shooter]);
        let mut enemies = vec![Enemy::new(210.0, 200.0, ENEMY_HEALTH)];
        let mut bullets = vec![Bullet {
            x: 195.0,
            y: 200.0,
            vx: 5.0,
            vy: 0.0,
            life: 10,
            owner: BulletOwner::Player(shooter_id),
        }];

        CombatSystem::update_bullets(&mut bullets, &mut enemies, &mut players);

        assert!(bullets.is_empty());
        assert_eq!(enemies[0].hp, ENEMY_HEALTH - PLAYER_BULLET_DAMAGE);
        assert_eq!(players[&shooter_id].kills, 0);
    }

    #[test]
    fn killing_blow_credits_shooter_and_removes_enemy() {
        let shooter = player_at(500.0, 500.0);
        let shooter_id = shooter.id;
        let mut players = roster(vec![shooter]);
        let mut enemies = vec![Enemy::new(200.0, 200.0, PLAYER_BULLET_DAMAGE)];
        let mut bullets = vec![Bullet {
            x: 200.0,
            y: 200.0,
            vx: 0.0,
            vy: 1.0,
            life: 10,
            owner: BulletOwner::Player(shooter_id),
        }];

        CombatSystem::update_bullets(&mut bullets, &mut enemies, &mut players);

        assert!(enemies.is_empty());
        assert_eq!(players[&shooter_id].kills, 1);
    }

    #[test]
    fn hostile_bullets_ignore_enemies_and_hit_players() {
        let p = player_at(200.0, 200.0);
        let id = p.id;
        let mut players = roster(vec![p]);
        let mut enemies = vec![Enemy::new(200.0, 200.0, ENEMY_HEALTH)];
        let mut bullets = vec![Bullet {
            x: 200.0,
            y: 195.0,
            vx: 0.0,
            vy: 1.0,
            life: 10,
            owner: BulletOwner::Hostile,
        }];

        CombatSystem::update_bullets(&mut bullets, &mut enemies, &mut players);

        assert!(bullets.is_empty());
        assert_eq!(enemies[0].hp, ENEMY_HEALTH);
        assert_eq!(players[&id].hp, 110.0 - ENEMY_BULLET_DAMAGE);
    }

    #[test]
    fn expired_and_out_of_bounds_bullets_are_dropped() {
        let mut players = HashMap::new();
        let mut enemies = Vec::new();
        let mut bullets = vec![
            Bullet { x: 100.0, y: 100.0, vx: 1.0, vy: 0.0, life: 1, owner: BulletOwner::Hostile },
            Bullet { x: 1.0, y: 100.0, vx: -5.0, vy: 0.0, life: 50, owner: BulletOwner::Hostile },
            Bullet { x: 100.0, y: 100.0, vx: 1.0, vy: 0.0, life: 50, owner: BulletOwner::Hostile },
        ];

        CombatSystem::update_bullets(&mut bullets, &mut enemies, &mut players);

        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].life, 49);
    }
}
