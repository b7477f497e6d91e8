//! World state and core simulation types
//!
//! One `World` per world-session. The render layer only ever sees a
//! [`Snapshot`] sampled after the last fixed step.

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::combat::Projectile;
use super::enemy::{Enemy, EnemyKind};
use super::motion::PlayerMotion;
use super::progression::{Phase, PodiumChoice, Progression, UpgradeKind, Upgrades};
use super::spawn::Spawner;
use super::summon::Summon;
use crate::tuning::Tuning;

/// Which of the two worlds a session simulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldKind {
    Fantasy,
    Skybase,
}

impl WorldKind {
    /// The sibling world (receives the boost when this world's monument falls)
    pub fn other(self) -> Self {
        match self {
            WorldKind::Fantasy => WorldKind::Skybase,
            WorldKind::Skybase => WorldKind::Fantasy,
        }
    }
}

/// The player actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Feet position
    pub pos: Vec3,
    /// Camera yaw (radians, 0 looks down -Z)
    pub yaw: f32,
    /// Camera pitch (radians)
    pub pitch: f32,
    pub motion: PlayerMotion,
    pub radius: f32,
}

impl Player {
    pub fn new(radius: f32) -> Self {
        Self {
            pos: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            motion: PlayerMotion::default(),
            radius,
        }
    }
}

/// Input for a single fixed step. Read once per step; the caller keeps
/// the latest values around between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInput {
    /// Stick (x = strafe, y = forward), clamped to the unit disc
    pub movement: Vec2,
    pub yaw: f32,
    pub pitch: f32,
    pub auto_walk: bool,
    /// Incremented once per shoot action; only changes are acted upon
    pub shoot_pulse: u64,
    /// Fire at the nearest enemy on a timer
    pub auto_attack: bool,
    /// External damage multiplier (upgrades owned outside the core)
    pub damage_mult: f32,
    /// Currency per shoot pulse
    pub tap_gain: f64,
    /// Passive income per simulated second
    pub auto_gain_per_sec: f64,
}

impl Default for StepInput {
    fn default() -> Self {
        Self {
            movement: Vec2::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            auto_walk: false,
            shoot_pulse: 0,
            auto_attack: false,
            damage_mult: 1.0,
            tap_gain: 0.0,
            auto_gain_per_sec: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencySource {
    Tap,
    Kill,
    Auto,
}

/// Notifications for the reward sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    CurrencyEarned { source: CurrencySource, amount: f64 },
    EnemyKilled { id: u32, kind: EnemyKind },
    PodiumReached { podiums: u32 },
    PodiumChosen { upgrade: UpgradeKind, level: u32 },
    MonumentReached { podiums: u32 },
    BossOpened { health: f64, max_health: f64, tier: u32 },
    BossRetreated { health: f64 },
    BossDefeated { tier: u32, monuments_cleared: u32, boost_target: WorldKind },
}

/// Complete simulation state of one world
#[derive(Debug, Clone)]
pub struct World {
    pub kind: WorldKind,
    pub seed: u64,
    pub tuning: Tuning,
    pub rng: Pcg32,
    /// Fixed steps executed
    pub time_ticks: u64,
    pub player: Player,
    /// Enemies in spawn order
    pub enemies: Vec<Enemy>,
    /// Projectiles in fire order
    pub projectiles: Vec<Projectile>,
    pub summon: Option<Summon>,
    pub spawner: Spawner,
    pub progression: Progression,
    /// Time since the last auto-attack shot
    pub auto_fire_timer: f32,
    /// Last shoot pulse acted upon
    pub last_shoot_pulse: u64,
    /// Passive income accrued but not yet paid out
    pub pending_auto_income: f64,
    /// Simulated time accrued toward the next passive payout
    pub auto_income_timer: f32,
    /// Events produced since the last drain
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl World {
    pub fn new(kind: WorldKind, seed: u64, tuning: Tuning) -> Self {
        let mut world = Self {
            kind,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            player: Player::new(tuning.motion.player_radius),
            enemies: Vec::new(),
            projectiles: Vec::new(),
            summon: None,
            spawner: Spawner::default(),
            progression: Progression::new(kind, tuning.progression.clone()),
            auto_fire_timer: 0.0,
            last_shoot_pulse: 0,
            pending_auto_income: 0.0,
            auto_income_timer: 0.0,
            events: Vec::new(),
            next_id: 1,
            tuning,
        };

        let id = world.next_entity_id();
        let z = world.tuning.spawn.initial_enemy_z;
        world.enemies.push(Enemy::new(id, EnemyKind::Normal, Vec3::new(0.0, 0.0, z)));

        if world.tuning.summon.enabled {
            let pos = world.player.pos + Vec3::new(0.6, 0.0, 0.6);
            world.summon = Some(Summon::new(pos));
        }

        world
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Player damage multiplier from the podium damage level
    pub fn damage_level_multiplier(&self) -> f32 {
        let level = self.progression.upgrades().level(UpgradeKind::Damage);
        1.0 + self.tuning.combat.damage_per_level * level as f32
    }

    /// Auto-attack shots per second at the current fire-rate level
    pub fn fire_rate(&self) -> f32 {
        let level = self.progression.upgrades().level(UpgradeKind::FireRate);
        self.tuning.combat.base_fire_rate * (1.0 + self.tuning.combat.fire_rate_per_level * level as f32)
    }

    /// Currency paid per kill before the enemy kind multiplier
    pub fn kill_reward(&self) -> f64 {
        let level = self.progression.upgrades().level(UpgradeKind::KillReward);
        self.tuning.combat.base_kill_reward + self.tuning.combat.kill_reward_per_level * level as f64
    }

    pub fn snapshot(&self) -> Snapshot {
        let boss = self.progression.boss();
        Snapshot {
            kind: self.kind,
            time_ticks: self.time_ticks,
            phase: self.progression.phase(),
            player_pos: self.player.pos,
            yaw: self.player.yaw,
            pitch: self.player.pitch,
            enemies: self.enemies.iter().filter(|e| e.is_alive()).count(),
            projectiles: self.projectiles.len(),
            summon_pos: self.summon.as_ref().map(|s| s.pos),
            kills: self.progression.kills(),
            podiums: self.progression.podiums(),
            monument_pending: self.progression.monument_pending(),
            monuments_owed: self.progression.monuments_owed(),
            tier: self.progression.tier(),
            monuments_cleared: self.progression.monuments_cleared(),
            upgrades: *self.progression.upgrades(),
            podium_choices: self.progression.choices().to_vec(),
            boss_health: boss.map(|b| b.health),
            boss_max_health: boss.map(|b| b.max_health),
        }
    }
}

/// Read-only view handed to the render and UI layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: WorldKind,
    pub time_ticks: u64,
    pub phase: Phase,
    pub player_pos: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Live enemies
    pub enemies: usize,
    pub projectiles: usize,
    pub summon_pos: Option<Vec3>,
    pub kills: u64,
    pub podiums: u32,
    pub monument_pending: bool,
    /// Monument bosses reached and not yet defeated
    pub monuments_owed: u32,
    pub tier: u32,
    pub monuments_cleared: u32,
    pub upgrades: Upgrades,
    pub podium_choices: Vec<PodiumChoice>,
    /// Monument boss health, open or parked
    pub boss_health: Option<f64>,
    pub boss_max_health: Option<f64>,
}
