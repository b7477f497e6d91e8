//! Projectiles and hit resolution
//!
//! Projectiles are processed in fire order, each one seeing the damage dealt
//! by the ones before it in the same step. A projectile is consumed by the
//! first live enemy (in list order) within that enemy's hit radius.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::enemy::{Enemy, EnemyKind};
use super::state::World;
use crate::uniform;

/// How much a projectile hurts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageSource {
    /// Player weapon: per-kind base damage scaled by the damage multipliers
    Weapon,
    /// Fixed amount (summon casts)
    Flat(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec3,
    pub vel: Vec3,
    /// Seconds left before it fizzles
    pub ttl: f32,
    pub source: DamageSource,
}

/// An enemy whose health reached zero this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub id: u32,
    pub kind: EnemyKind,
}

/// Index of the live enemy closest to `from`. Ties go to the earlier enemy.
pub fn nearest_alive(enemies: &[Enemy], from: Vec3) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, e) in enemies.iter().enumerate() {
        if !e.is_alive() {
            continue;
        }
        let d = e.pos.distance_squared(from);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Velocity for a shot from `muzzle` at `target`'s aim point with per-axis
/// uniform spread. Falls back to -Z when the aim direction degenerates.
pub fn aim_shot<R: Rng>(rng: &mut R, muzzle: Vec3, target: &Enemy, speed: f32) -> Vec3 {
    let stats = target.kind.stats();
    let aim = target.pos + Vec3::Y * stats.aim_height;
    let s = stats.spread;
    let dir = (aim - muzzle).normalize_or(Vec3::NEG_Z);
    let jitter = Vec3::new(
        uniform(rng, -s, s),
        uniform(rng, -s, s),
        uniform(rng, -s, s),
    );
    (dir + jitter).normalize_or(dir) * speed
}

/// Spawn one projectile from `muzzle` toward enemy `target`
pub fn launch(world: &mut World, muzzle: Vec3, target: usize, source: DamageSource) -> Option<u32> {
    let cfg = &world.tuning.combat;
    let (speed, ttl) = (cfg.projectile_speed, cfg.projectile_ttl);
    let enemy = world.enemies.get(target)?;
    if !enemy.is_alive() {
        return None;
    }
    let vel = aim_shot(&mut world.rng, muzzle, enemy, speed);
    let id = world.next_entity_id();
    world.projectiles.push(Projectile {
        id,
        pos: muzzle,
        vel,
        ttl,
        source,
    });
    Some(id)
}

/// Player shot at the nearest live enemy. Returns false (and spawns nothing)
/// when no enemy is alive.
pub fn request_fire(world: &mut World) -> bool {
    let p = world.player.pos;
    let cfg = &world.tuning.combat;
    let muzzle = Vec3::new(p.x, cfg.muzzle_height, p.z - cfg.muzzle_forward);
    let Some(target) = nearest_alive(&world.enemies, p) else {
        return false;
    };
    match launch(world, muzzle, target, DamageSource::Weapon) {
        Some(id) => {
            log::debug!("Projectile {} fired at enemy {}", id, world.enemies[target].id);
            true
        }
        None => false,
    }
}

/// Advance every projectile by one step and resolve hits.
///
/// `damage_mult` scales weapon damage (podium level and external upgrades
/// combined). Returns the enemies killed, each exactly once.
pub fn advance_projectiles(world: &mut World, dt: f32, damage_mult: f32) -> Vec<Kill> {
    let mut kills = Vec::new();
    let enemies = &mut world.enemies;

    world.projectiles.retain_mut(|proj| {
        proj.pos += proj.vel * dt;
        proj.ttl -= dt;
        if proj.ttl <= 0.0 {
            return false;
        }

        let Some(enemy) = enemies.iter_mut().find(|e| {
            e.is_alive() && e.pos.distance_squared(proj.pos) <= e.kind.stats().hit_radius.powi(2)
        }) else {
            return true;
        };

        let damage = match proj.source {
            DamageSource::Weapon => enemy.kind.stats().weapon_damage * damage_mult,
            DamageSource::Flat(amount) => amount,
        };
        if enemy.apply_damage(damage) {
            kills.push(Kill {
                id: enemy.id,
                kind: enemy.kind,
            });
        }
        false
    });

    kills
}
