//! Enemy kinds and their stat table

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Enemy variant. Boss-kind enemies are tougher regular spawns, not the
/// monument boss (which is a progression gate, see `progression`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Normal,
    Boss,
}

/// Per-kind constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindStats {
    pub max_health: f32,
    /// Pursuit speed (units/s)
    pub speed: f32,
    /// Melee reach: pursuit stops this far from the player
    pub reach: f32,
    /// Projectile hit radius around the enemy's position
    pub hit_radius: f32,
    /// Radius used against static colliders
    pub collision_radius: f32,
    /// Aim point height above the enemy's position
    pub aim_height: f32,
    /// Random spread added to each axis of a shot aimed at this kind
    pub spread: f32,
    /// Spawn height (Y) of the enemy's position
    pub spawn_height: f32,
    /// Player weapon damage per projectile before multipliers
    pub weapon_damage: f32,
    /// Multiplier on the kill reward
    pub reward_multiplier: f64,
}

const NORMAL_STATS: KindStats = KindStats {
    max_health: 40.0,
    speed: 2.7,
    reach: 1.15,
    hit_radius: 1.05,
    collision_radius: 0.55,
    aim_height: 0.4,
    spread: 0.14,
    spawn_height: 0.7,
    weapon_damage: 12.0,
    reward_multiplier: 1.0,
};

const BOSS_STATS: KindStats = KindStats {
    max_health: 120.0,
    speed: 2.1,
    reach: 1.8,
    hit_radius: 2.35,
    collision_radius: 1.4,
    aim_height: 1.2,
    spread: 0.10,
    spawn_height: 1.2,
    weapon_damage: 8.0,
    reward_multiplier: 3.0,
};

impl EnemyKind {
    #[inline]
    pub const fn stats(self) -> &'static KindStats {
        match self {
            EnemyKind::Normal => &NORMAL_STATS,
            EnemyKind::Boss => &BOSS_STATS,
        }
    }
}

/// A live (or just-killed) enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
}

impl Enemy {
    /// New enemy at full health; `pos.y` is replaced by the kind's spawn height
    pub fn new(id: u32, kind: EnemyKind, pos: Vec3) -> Self {
        let stats = kind.stats();
        Self {
            id,
            kind,
            pos: Vec3::new(pos.x, stats.spawn_height, pos.z),
            health: stats.max_health,
            max_health: stats.max_health,
            speed: stats.speed,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Subtract damage, clamped at zero. Returns true only on the transition
    /// from alive to dead, so a kill is reported exactly once.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.health = (self.health - amount).max(0.0);
        self.health == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_transition_fires_once() {
        let mut e = Enemy::new(1, EnemyKind::Normal, Vec3::ZERO);
        assert!(!e.apply_damage(30.0));
        assert!(e.apply_damage(30.0));
        assert_eq!(e.health, 0.0);
        assert!(!e.apply_damage(30.0));
        assert_eq!(e.health, 0.0);
    }

    #[test]
    fn test_damage_never_heals() {
        let mut e = Enemy::new(1, EnemyKind::Boss, Vec3::ZERO);
        e.apply_damage(-50.0);
        e.apply_damage(f32::NAN);
        assert_eq!(e.health, e.max_health);
    }

    #[test]
    fn test_spawn_height_from_kind() {
        let e = Enemy::new(1, EnemyKind::Boss, Vec3::new(2.0, 9.0, -20.0));
        assert_eq!(e.pos, Vec3::new(2.0, 1.2, -20.0));
        assert!(EnemyKind::Boss.stats().hit_radius > EnemyKind::Normal.stats().hit_radius);
        assert!(EnemyKind::Boss.stats().spread < EnemyKind::Normal.stats().spread);
    }
}
