//! Camera poses handed to the rendering layer
//!
//! Fantasy is first person at eye height; the skybase uses an orbit rig
//! around the hub. Both are plain functions of post-step state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{EYE_HEIGHT, PITCH_LIMIT};

/// Radians of yaw/pitch per pixel of first-person drag
const LOOK_SENSITIVITY: f32 = 0.0055;
/// Radians of yaw per pixel of orbit drag
const ORBIT_YAW_SENSITIVITY: f32 = 0.0065;
/// Radians of pitch per pixel of orbit drag
const ORBIT_PITCH_SENSITIVITY: f32 = 0.0030;

const ORBIT_ZOOM_MIN: f32 = 16.0;
const ORBIT_ZOOM_MAX: f32 = 90.0;
const ORBIT_PITCH_MIN: f32 = -0.32;
const ORBIT_PITCH_MAX: f32 = 0.75;
/// Smallest pinch ratio honoured (limits zoom-out per gesture)
const MIN_PINCH_RATIO: f32 = 0.25;

/// Camera position and orientation (yaw 0 looks down -Z, positive pitch looks up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraPose {
    /// Eye of a player standing at `feet`
    pub fn first_person(feet: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position: Vec3::new(feet.x, EYE_HEIGHT, feet.z),
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    /// Pose at `position` looking at `target`
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).normalize_or(Vec3::NEG_Z);
        Self {
            position,
            yaw: (-dir.x).atan2(-dir.z),
            pitch: dir.y.clamp(-1.0, 1.0).asin(),
        }
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }
}

/// First-person drag look
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LookRig {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookRig {
    /// Apply a drag in pixels. Dragging right turns right; dragging down looks up.
    pub fn apply_drag(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.yaw -= dx * LOOK_SENSITIVITY;
        self.pitch = (self.pitch - dy * LOOK_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// Skybase orbit camera around the hub at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitRig {
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
    /// Finger distance and radius when the current pinch started
    pinch_start: Option<(f32, f32)>,
}

impl Default for OrbitRig {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: -0.18,
            radius: 34.0,
            pinch_start: None,
        }
    }
}

impl OrbitRig {
    /// One-finger rotate
    pub fn apply_drag(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.yaw -= dx * ORBIT_YAW_SENSITIVITY;
        self.pitch = (self.pitch + dy * ORBIT_PITCH_SENSITIVITY).clamp(ORBIT_PITCH_MIN, ORBIT_PITCH_MAX);
    }

    /// Two-finger pinch with the current finger distance in pixels.
    /// Spreading the fingers zooms in.
    pub fn pinch(&mut self, finger_distance: f32) {
        if !finger_distance.is_finite() {
            return;
        }
        let (dist0, r0) = *self
            .pinch_start
            .get_or_insert((finger_distance.max(1.0), self.radius));
        let ratio = finger_distance / dist0.max(1.0);
        self.radius = (r0 / ratio.max(MIN_PINCH_RATIO)).clamp(ORBIT_ZOOM_MIN, ORBIT_ZOOM_MAX);
    }

    pub fn end_pinch(&mut self) {
        self.pinch_start = None;
    }

    /// Camera pose for a hub whose top is at `target_y`
    pub fn pose(&self, target_y: f32) -> CameraPose {
        let (sp, cp) = self.pitch.sin_cos();
        let position = Vec3::new(
            self.yaw.sin() * self.radius * cp,
            target_y + 2.2 + sp * self.radius * 0.55,
            self.yaw.cos() * self.radius * cp,
        );
        CameraPose::looking_at(position, Vec3::new(0.0, target_y + 1.0, 0.0))
    }
}
