//! Player and enemy motion
//!
//! The player's stick input is camera-relative: `x` strafes, `y` moves
//! forward. A smoothed local velocity chases the stick target with separate
//! acceleration and deceleration limits.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::sanitize_stick;
use crate::tuning::MotionTuning;

/// Stick magnitude under which input counts as released
const INPUT_DEADZONE: f32 = 0.001;
/// Pursuit steps shorter than this are skipped
const MIN_PURSUIT_STEP: f32 = 0.0001;

/// World-space (forward, right) on the ground plane for a camera yaw.
/// Yaw 0 looks down -Z.
#[inline]
pub fn camera_basis(yaw: f32) -> (Vec3, Vec3) {
    let (s, c) = yaw.sin_cos();
    let forward = Vec3::new(-s, 0.0, -c);
    let right = Vec3::new(c, 0.0, -s);
    (forward, right)
}

/// Smoothed player velocity in local (right, forward) space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMotion {
    pub local_vel: Vec2,
}

impl PlayerMotion {
    /// Integrate one fixed step. Returns the world-space displacement applied.
    pub fn step(
        &mut self,
        pos: &mut Vec3,
        stick: Vec2,
        yaw: f32,
        auto_walk: bool,
        dt: f32,
        cfg: &MotionTuning,
    ) -> Vec3 {
        let input = sanitize_stick(stick);
        let active = input.x.abs() > INPUT_DEADZONE || input.y.abs() > INPUT_DEADZONE;

        let target = input * cfg.max_speed;
        let accel = if active { cfg.accel } else { cfg.decel };
        let max_delta = accel * dt;
        let delta = (target - self.local_vel).clamp(Vec2::splat(-max_delta), Vec2::splat(max_delta));
        self.local_vel += delta;

        if !active && auto_walk {
            self.local_vel = Vec2::new(0.0, cfg.max_speed);
        }

        let (forward, right) = camera_basis(if yaw.is_finite() { yaw } else { 0.0 });
        let world_vel = right * self.local_vel.x + forward * self.local_vel.y;
        let displacement = world_vel * dt;
        *pos += displacement;
        displacement
    }

    pub fn reset(&mut self) {
        self.local_vel = Vec2::ZERO;
    }
}

/// Keep the player inside the lane and not too far behind the spawn
#[inline]
pub fn clamp_to_lane(pos: &mut Vec3, cfg: &MotionTuning) {
    pos.x = pos.x.clamp(-cfg.lane_half_width, cfg.lane_half_width);
    pos.z = pos.z.min(cfg.max_behind_spawn);
}

/// Straight-line pursuit on the ground plane. Moves at most `speed * dt`
/// and stops `reach` short of the target. Returns the new position.
pub fn pursue(from: Vec3, target: Vec3, speed: f32, reach: f32, dt: f32) -> Vec3 {
    let to = Vec3::new(target.x - from.x, 0.0, target.z - from.z);
    let dist = to.length();
    if dist <= 1e-3 {
        return from;
    }
    let dir = to / dist;
    let step = (dist - reach).max(0.0).min(speed * dt);
    if step > MIN_PURSUIT_STEP {
        from + dir * step
    } else {
        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    #[test]
    fn test_basis_at_zero_yaw() {
        let (f, r) = camera_basis(0.0);
        assert!((f - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
        assert!((r - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_acceleration_is_limited() {
        let cfg = MotionTuning::default();
        let mut m = PlayerMotion::default();
        let mut pos = Vec3::ZERO;
        m.step(&mut pos, Vec2::new(0.0, 1.0), 0.0, false, SIM_DT, &cfg);
        assert!((m.local_vel.y - cfg.accel * SIM_DT).abs() < 1e-5);

        for _ in 0..60 {
            m.step(&mut pos, Vec2::new(0.0, 1.0), 0.0, false, SIM_DT, &cfg);
        }
        assert!((m.local_vel.y - cfg.max_speed).abs() < 1e-4);
        assert!(pos.z < 0.0);
    }

    #[test]
    fn test_release_decelerates_faster() {
        let cfg = MotionTuning::default();
        let mut m = PlayerMotion {
            local_vel: Vec2::new(0.0, cfg.max_speed),
        };
        let mut pos = Vec3::ZERO;
        m.step(&mut pos, Vec2::ZERO, 0.0, false, SIM_DT, &cfg);
        assert!((cfg.max_speed - m.local_vel.y - cfg.decel * SIM_DT).abs() < 1e-5);
    }

    #[test]
    fn test_auto_walk_forces_forward() {
        let cfg = MotionTuning::default();
        let mut m = PlayerMotion {
            local_vel: Vec2::new(3.0, 0.0),
        };
        let mut pos = Vec3::ZERO;
        let d = m.step(&mut pos, Vec2::ZERO, 0.0, true, SIM_DT, &cfg);
        assert_eq!(m.local_vel, Vec2::new(0.0, cfg.max_speed));
        assert!((d.z + cfg.max_speed * SIM_DT).abs() < 1e-6);
        assert!(d.x.abs() < 1e-6);
    }

    #[test]
    fn test_stick_input_overrides_auto_walk() {
        let cfg = MotionTuning::default();
        let mut m = PlayerMotion::default();
        let mut pos = Vec3::ZERO;
        m.step(&mut pos, Vec2::new(1.0, 0.0), 0.0, true, SIM_DT, &cfg);
        assert!(m.local_vel.x > 0.0);
        assert_eq!(m.local_vel.y, 0.0);
    }

    #[test]
    fn test_diagonal_not_faster() {
        let cfg = MotionTuning::default();
        let mut m = PlayerMotion::default();
        let mut pos = Vec3::ZERO;
        for _ in 0..120 {
            m.step(&mut pos, Vec2::new(5.0, 5.0), 0.3, false, SIM_DT, &cfg);
        }
        assert!(m.local_vel.length() <= cfg.max_speed + 1e-4);
    }

    #[test]
    fn test_yaw_rotates_movement() {
        let cfg = MotionTuning::default();
        let mut m = PlayerMotion::default();
        let mut pos = Vec3::ZERO;
        // Quarter turn left: forward becomes -X
        m.step(&mut pos, Vec2::ZERO, std::f32::consts::FRAC_PI_2, true, SIM_DT, &cfg);
        assert!(pos.x < 0.0);
        assert!(pos.z.abs() < 1e-5);
    }

    #[test]
    fn test_lane_clamp() {
        let cfg = MotionTuning::default();
        let mut pos = Vec3::new(40.0, 0.0, 50.0);
        clamp_to_lane(&mut pos, &cfg);
        assert_eq!(pos.x, cfg.lane_half_width);
        assert_eq!(pos.z, cfg.max_behind_spawn);
    }

    #[test]
    fn test_pursuit_stops_at_reach() {
        let target = Vec3::new(0.0, 0.0, 0.0);
        let mut pos = Vec3::new(0.0, 0.7, -5.0);
        for _ in 0..600 {
            pos = pursue(pos, target, 2.7, 1.15, SIM_DT);
        }
        let d = Vec3::new(pos.x, 0.0, pos.z).length();
        assert!((d - 1.15).abs() < 1e-3);
        assert_eq!(pos.y, 0.7);
    }

    #[test]
    fn test_pursuit_speed_cap() {
        let next = pursue(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, 2.0, 1.0, 0.5);
        assert!((next.z + 9.0).abs() < 1e-5);
        // Coincident positions do not produce NaN
        let same = pursue(Vec3::ZERO, Vec3::ZERO, 2.0, 1.0, 0.5);
        assert_eq!(same, Vec3::ZERO);
    }
}
