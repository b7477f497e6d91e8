//! Data-driven game balance
//!
//! Every value has a shipped default; JSON files only need the fields they
//! override.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Player movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Top speed (units/s)
    pub max_speed: f32,
    /// Acceleration while the stick is held (units/s²)
    pub accel: f32,
    /// Deceleration once the stick is released (units/s²)
    pub decel: f32,
    /// Player X is clamped to ±this
    pub lane_half_width: f32,
    /// Player Z never exceeds this (the spawn is at 0, forward is -Z)
    pub max_behind_spawn: f32,
    pub player_radius: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            max_speed: 5.3,
            accel: 22.0,
            decel: 38.0,
            lane_half_width: 12.5,
            max_behind_spawn: 18.0,
            player_radius: 0.45,
        }
    }
}

/// Static collision resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    /// Mesh resolution passes per step
    pub passes: u32,
    /// Contact slop added to the actor radius
    pub epsilon: f32,
    /// Largest correction applied by a single collider in a single pass
    pub max_push_per_pass: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            passes: 4,
            epsilon: 0.001,
            max_push_per_pass: 0.35,
        }
    }
}

/// Enemy spawning and pool pruning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Seconds between spawns
    pub interval: f32,
    pub ahead_min: f32,
    pub ahead_max: f32,
    /// Spawn X is uniform in ±this
    pub x_range: f32,
    /// Chance a spawn is a boss-kind enemy
    pub boss_chance: f32,
    /// Enemies further than this behind the player are dropped
    pub prune_behind: f32,
    /// Enemies further than this ahead of the player are dropped
    pub prune_ahead: f32,
    /// Z of the enemy placed at session start
    pub initial_enemy_z: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            interval: 1.0,
            ahead_min: 18.0,
            ahead_max: 55.0,
            x_range: 10.0,
            boss_chance: 0.06,
            prune_behind: 18.0,
            prune_ahead: 900.0,
            initial_enemy_z: -12.0,
        }
    }
}

/// Projectiles, auto-attack and kill rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    pub projectile_speed: f32,
    /// Projectile lifetime (s)
    pub projectile_ttl: f32,
    pub muzzle_height: f32,
    /// Muzzle offset along -Z from the player
    pub muzzle_forward: f32,
    /// Auto-attack shots per second at fire-rate level 0
    pub base_fire_rate: f32,
    /// Fire-rate multiplier added per level
    pub fire_rate_per_level: f32,
    /// Damage multiplier added per level
    pub damage_per_level: f32,
    pub base_kill_reward: f64,
    pub kill_reward_per_level: f64,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            projectile_speed: 22.0,
            projectile_ttl: 2.2,
            muzzle_height: 1.05,
            muzzle_forward: 0.2,
            base_fire_rate: 1.5,
            fire_rate_per_level: 0.15,
            damage_per_level: 0.1,
            base_kill_reward: 2.0,
            kill_reward_per_level: 1.0,
        }
    }
}

/// Podium and monument-boss cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    pub kills_per_podium: u32,
    pub podiums_per_monument: u32,
    pub boss_base_health: f64,
    /// Health multiplier per tier above 1
    pub boss_health_growth: f64,
    /// Extra health per podium reached
    pub boss_health_per_podium: f64,
    /// Auto-attack damage per second against the monument boss
    pub boss_base_dps: f64,
    /// Damage per shoot pulse against the monument boss
    pub boss_tap_damage: f64,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            kills_per_podium: 10,
            podiums_per_monument: 10,
            boss_base_health: 500.0,
            boss_health_growth: 1.35,
            boss_health_per_podium: 5.0,
            boss_base_dps: 10.0,
            boss_tap_damage: 8.0,
        }
    }
}

/// Chunk streaming window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkTuning {
    pub length: f32,
    /// Chunks kept behind the player's chunk
    pub behind: u32,
    /// Chunks kept ahead of (and including) the player's chunk
    pub ahead: u32,
}

impl Default for ChunkTuning {
    fn default() -> Self {
        Self {
            length: 40.0,
            behind: 24,
            ahead: 14,
        }
    }
}

/// Procedural valley layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValleyTuning {
    pub mountain_bands: u32,
    pub mountain_x: f32,
    pub mountain_radius: f32,
    pub mountain_height: f32,
    pub mountain_sides: u32,
    pub podium_spacing: f32,
    pub podium_x: f32,
    pub podium_size: f32,
    pub monument_x: f32,
    pub monument_y: f32,
    pub monument_z: f32,
    pub monument_radius: f32,
}

impl Default for ValleyTuning {
    fn default() -> Self {
        Self {
            mountain_bands: 7,
            mountain_x: 20.0,
            mountain_radius: 4.2,
            mountain_height: 7.5,
            mountain_sides: 6,
            podium_spacing: 26.0,
            podium_x: 3.8,
            podium_size: 1.35,
            monument_x: 6.6,
            monument_y: 1.8,
            monument_z: -320.0,
            monument_radius: 2.6,
        }
    }
}

/// Companion summon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummonTuning {
    pub enabled: bool,
    /// How far it can see enemies
    pub aggro_radius: f32,
    /// How far it may wander from the player
    pub explore_radius: f32,
    /// Preference for staying near the player (0..1)
    pub follow_tightness: f32,
    /// Casts per second
    pub fire_rate: f32,
    pub projectile_damage: f32,
    pub base_speed: f32,
    /// Seconds from cast start to projectile release
    pub cast_windup: f32,
    /// Chance per step to wander when idle
    pub explore_chance: f32,
}

impl Default for SummonTuning {
    fn default() -> Self {
        Self {
            enabled: false,
            aggro_radius: 8.0,
            explore_radius: 5.0,
            follow_tightness: 0.8,
            fire_rate: 1.2,
            projectile_damage: 1.0,
            base_speed: 2.2,
            cast_windup: 0.45,
            explore_chance: 0.15,
        }
    }
}

/// Complete balance sheet for one world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub motion: MotionTuning,
    pub collision: CollisionTuning,
    pub spawn: SpawnTuning,
    pub combat: CombatTuning,
    pub progression: ProgressionTuning,
    pub chunks: ChunkTuning,
    pub valley: ValleyTuning,
    pub summon: SummonTuning,
}

impl Tuning {
    /// Parse and validate a (possibly partial) JSON document
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        positive("motion.max_speed", self.motion.max_speed)?;
        positive("motion.accel", self.motion.accel)?;
        positive("motion.decel", self.motion.decel)?;
        positive("motion.lane_half_width", self.motion.lane_half_width)?;
        positive("motion.player_radius", self.motion.player_radius)?;
        positive("collision.max_push_per_pass", self.collision.max_push_per_pass)?;
        if self.collision.passes == 0 {
            return Err(invalid("collision.passes", "must be at least 1"));
        }
        positive("spawn.interval", self.spawn.interval)?;
        ordered("spawn.ahead_min", self.spawn.ahead_min, self.spawn.ahead_max)?;
        if !(0.0..=1.0).contains(&self.spawn.boss_chance) {
            return Err(invalid("spawn.boss_chance", "must be within [0, 1]"));
        }
        positive("combat.projectile_speed", self.combat.projectile_speed)?;
        positive("combat.projectile_ttl", self.combat.projectile_ttl)?;
        positive("combat.base_fire_rate", self.combat.base_fire_rate)?;
        if self.progression.kills_per_podium == 0 {
            return Err(invalid("progression.kills_per_podium", "must be at least 1"));
        }
        if self.progression.podiums_per_monument == 0 {
            return Err(invalid("progression.podiums_per_monument", "must be at least 1"));
        }
        if !(self.progression.boss_base_health > 0.0) {
            return Err(invalid("progression.boss_base_health", "must be positive"));
        }
        positive("chunks.length", self.chunks.length)?;
        if self.chunks.ahead == 0 {
            return Err(invalid("chunks.ahead", "must include the player's chunk"));
        }
        if !(0.0..=1.0).contains(&self.summon.explore_chance) {
            return Err(invalid("summon.explore_chance", "must be within [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> TuningError {
    TuningError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    // Written negated so NaN fails too
    if !(value > 0.0) {
        return Err(TuningError::Invalid {
            field,
            reason: format!("must be positive, got {value}"),
        });
    }
    Ok(())
}

fn ordered(field: &'static str, lo: f32, hi: f32) -> Result<(), TuningError> {
    if !(lo <= hi) {
        return Err(TuningError::Invalid {
            field,
            reason: format!("minimum {lo} exceeds maximum {hi}"),
        });
    }
    Ok(())
}
