//! Enemy spawn cadence and pool pruning

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::enemy::{Enemy, EnemyKind};
use super::state::World;
use crate::tuning::SpawnTuning;
use crate::uniform;

/// Spawn timer. Runs only while the world is idle (not gated by a podium or boss).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    pub timer: f32,
}

/// Advance the spawn timer. On expiry one enemy spawns ahead of the player
/// and the pool is pruned. Returns the new enemy's id.
pub fn step_spawner(world: &mut World, dt: f32) -> Option<u32> {
    world.spawner.timer += dt;
    if world.spawner.timer < world.tuning.spawn.interval {
        return None;
    }
    world.spawner.timer = 0.0;

    let cfg = &world.tuning.spawn;
    let p = world.player.pos;
    let (ahead_min, ahead_max, x_range, boss_chance) =
        (cfg.ahead_min, cfg.ahead_max, cfg.x_range, cfg.boss_chance);

    let ahead = uniform(&mut world.rng, ahead_min, ahead_max);
    let kind = if world.rng.random_bool(f64::from(boss_chance.clamp(0.0, 1.0))) {
        EnemyKind::Boss
    } else {
        EnemyKind::Normal
    };
    let x = uniform(&mut world.rng, -x_range, x_range);

    let id = world.next_entity_id();
    world.enemies.push(Enemy::new(id, kind, Vec3::new(x, 0.0, p.z - ahead)));
    let pruned = prune_enemies(&mut world.enemies, p.z, &world.tuning.spawn);
    log::debug!("Spawned {:?} enemy {} ({} pruned)", kind, id, pruned);
    Some(id)
}

/// Drop dead enemies and those outside `(player_z - prune_ahead, player_z + prune_behind)`.
/// Returns how many were removed.
pub fn prune_enemies(enemies: &mut Vec<Enemy>, player_z: f32, cfg: &SpawnTuning) -> usize {
    let before = enemies.len();
    enemies.retain(|e| {
        e.is_alive() && e.pos.z < player_z + cfg.prune_behind && e.pos.z > player_z - cfg.prune_ahead
    });
    before - enemies.len()
}
