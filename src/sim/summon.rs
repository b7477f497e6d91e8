//! Companion summon AI
//!
//! A single helper that follows the player, wanders occasionally and casts
//! at enemies inside its aggro radius. Casts have a wind-up; the projectile
//! is released when the wind-up completes, provided the target still lives.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::combat::{self, DamageSource};
use super::state::World;
use crate::tuning::SummonTuning;
use crate::{flatten, uniform};

/// Orbit distance kept from the player while following
const FOLLOW_ORBIT: f32 = 0.9;
/// Closest wander target to the player
const MIN_EXPLORE_RADIUS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummonMode {
    Follow,
    Explore,
    Attack,
}

/// A cast in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    /// Enemy id being cast at
    pub target: u32,
    /// Seconds into the wind-up
    pub elapsed: f32,
    /// Animation variant (1..=3)
    pub spell: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summon {
    pub pos: Vec3,
    pub vel: Vec3,
    pub mode: SummonMode,
    /// Enemy id being chased in `Attack` mode
    pub target: Option<u32>,
    /// Seconds until the next cast may start
    pub cooldown: f32,
    pub cast: Option<Cast>,
}

impl Summon {
    pub fn new(pos: Vec3) -> Self {
        Self {
            pos,
            vel: Vec3::ZERO,
            mode: SummonMode::Follow,
            target: None,
            cooldown: 0.0,
            cast: None,
        }
    }

    /// Ground speed derived from follow tightness
    pub fn speed(cfg: &SummonTuning) -> f32 {
        cfg.base_speed * (0.6 + cfg.follow_tightness * 0.8)
    }
}

/// Advance the summon by one step. Returns the id of a projectile released
/// this step, if any.
pub fn step_summon(world: &mut World, dt: f32) -> Option<u32> {
    let mut summon = world.summon.take()?;
    let fired = drive(&mut summon, world, dt);
    world.summon = Some(summon);
    fired
}

fn drive(s: &mut Summon, world: &mut World, dt: f32) -> Option<u32> {
    let cfg = world.tuning.summon.clone();
    let player = world.player.pos;
    let mut fired = None;

    s.cooldown = (s.cooldown - dt).max(0.0);

    if let Some(mut cast) = s.cast.take() {
        cast.elapsed += dt;
        let target = world
            .enemies
            .iter()
            .position(|e| e.id == cast.target && e.is_alive());
        match target {
            None => {}
            Some(index) if cast.elapsed >= cfg.cast_windup => {
                fired = combat::launch(world, s.pos, index, DamageSource::Flat(cfg.projectile_damage));
                if let Some(id) = fired {
                    log::debug!("Summon cast {} released projectile {}", cast.spell, id);
                }
            }
            Some(_) => s.cast = Some(cast),
        }
    }

    // Nearest live enemy inside aggro range
    let aggro_sq = cfg.aggro_radius * cfg.aggro_radius;
    let nearest = world
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| (e.id, e.pos, e.pos.distance_squared(s.pos)))
        .filter(|&(_, _, d)| d <= aggro_sq)
        .fold(None, |best: Option<(u32, Vec3, f32)>, cur| match best {
            Some(b) if b.2 <= cur.2 => Some(b),
            _ => Some(cur),
        });

    let goal = match nearest {
        Some((id, pos, _)) => {
            s.mode = SummonMode::Attack;
            s.target = Some(id);
            pos
        }
        None => {
            s.target = None;
            let near_player = s.pos.distance_squared(player) < cfg.explore_radius * cfg.explore_radius;
            let wants_explore = world.rng.random::<f32>() < cfg.explore_chance;
            s.mode = if wants_explore && near_player {
                SummonMode::Explore
            } else {
                SummonMode::Follow
            };
            let angle = uniform(&mut world.rng, 0.0, TAU);
            let radius = match s.mode {
                SummonMode::Explore => {
                    let r = world.rng.random::<f32>() * cfg.explore_radius;
                    r.clamp(MIN_EXPLORE_RADIUS.min(cfg.explore_radius), cfg.explore_radius)
                }
                _ => FOLLOW_ORBIT,
            };
            player + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
        }
    };

    let to_goal = flatten(goal - s.pos);
    let dist = to_goal.length();
    let speed = Summon::speed(&cfg);
    s.vel = if dist > 1e-6 { to_goal / dist * speed } else { Vec3::ZERO };
    s.pos += s.vel * dt.min(if speed > 0.0 { dist / speed } else { 0.0 });

    if let (SummonMode::Attack, Some(target)) = (s.mode, s.target) {
        if s.cast.is_none() && s.cooldown <= 0.0 {
            s.cooldown = 1.0 / cfg.fire_rate.max(0.1);
            s.cast = Some(Cast {
                target,
                elapsed: 0.0,
                spell: world.rng.random_range(1..=3),
            });
        }
    }

    fired
}
