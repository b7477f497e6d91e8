//! Twinworld - simulation core for a two-world idle/action runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (motion, collision, combat, progression)
//! - `camera`: Camera poses handed to the rendering layer
//! - `tuning`: Data-driven game balance

pub mod camera;
pub mod sim;
pub mod tuning;

pub use camera::{CameraPose, LookRig, OrbitRig};
pub use tuning::{Tuning, TuningError};

use glam::{Vec2, Vec3};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum fixed steps per render callback
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Camera eye height above the player's feet
    pub const EYE_HEIGHT: f32 = 1.55;
    /// Look pitch limit for the first-person camera (radians)
    pub const PITCH_LIMIT: f32 = 0.95;

    /// Below this length a direction is treated as degenerate
    pub const DEGENERATE_LEN: f32 = 1e-6;
}

/// Drop the vertical component (collision and pursuit work in the ground plane)
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Ground-plane projection as a 2D vector (x, z)
#[inline]
pub fn xz(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Uniform sample in `[lo, hi)`; tolerates `lo == hi` instead of panicking
#[inline]
pub fn uniform<R: rand::Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    lo + rng.random::<f32>() * (hi - lo)
}

/// Clamp a 2D stick vector: non-finite axes become zero, magnitude never exceeds 1
#[inline]
pub fn sanitize_stick(raw: Vec2) -> Vec2 {
    let x = if raw.x.is_finite() { raw.x } else { 0.0 };
    let y = if raw.y.is_finite() { raw.y } else { 0.0 };
    let v = Vec2::new(x, y);
    let mag = v.length();
    if mag > 1.0 { v / mag } else { v }
}
