//! Collision resolution against static level geometry
//!
//! Two strategies, both run after motion integration:
//! - circle vs. axis-aligned box on the ground plane (podium markers), one pass
//! - sphere vs. mesh BVH (mountains, structures), several passes so that
//!   overlapping colliders settle instead of fighting each other
//!
//! Corrections are horizontal only. Overhangs never push an actor up or down.

use glam::{Vec2, Vec3};

use super::colliders::{BoxCollider, ColliderRegistry, MeshCollider};
use crate::consts::DEGENERATE_LEN;
use crate::flatten;
use crate::tuning::CollisionTuning;

/// `(p - closest) · normal` below this means the point is inside the mesh
const INSIDE_TOLERANCE: f32 = 1e-5;

/// A single push-out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit push direction on the ground plane (y = 0)
    pub direction: Vec3,
    /// Distance needed to clear the collider
    pub penetration: f32,
}

/// What a mesh resolution pass loop did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Passes executed
    pub passes: u32,
    /// Individual corrections applied
    pub pushes: u32,
    /// False when the pass cap was reached with contacts remaining
    pub settled: bool,
}

/// Circle (ground-plane projection of the actor) vs. box
pub fn circle_box_contact(pos: Vec3, radius: f32, b: &BoxCollider) -> Option<Contact> {
    let p = Vec2::new(pos.x, pos.z);
    let closest = p.clamp(b.min, b.max);
    let offset = p - closest;
    let dist_sq = offset.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    if dist > DEGENERATE_LEN {
        let dir = offset / dist;
        return Some(Contact {
            direction: Vec3::new(dir.x, 0.0, dir.y),
            penetration: radius - dist,
        });
    }

    // Centre inside the box: leave through the nearest side
    let exits = [
        (p.x - b.min.x, Vec3::NEG_X),
        (b.max.x - p.x, Vec3::X),
        (p.y - b.min.y, Vec3::NEG_Z),
        (b.max.y - p.y, Vec3::Z),
    ];
    let (depth, direction) = exits
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .unwrap_or((0.0, Vec3::X));
    Some(Contact {
        direction,
        penetration: depth + radius,
    })
}

/// Push out of every box once
pub fn resolve_boxes<'a, I>(pos: &mut Vec3, radius: f32, boxes: I) -> u32
where
    I: IntoIterator<Item = &'a BoxCollider>,
{
    let mut pushes = 0;
    for b in boxes {
        if let Some(c) = circle_box_contact(*pos, radius, b) {
            *pos += c.direction * c.penetration;
            pushes += 1;
        }
    }
    pushes
}

/// Sphere vs. one mesh collider
///
/// Uses the closest surface point from the BVH. Outside the mesh the push is
/// away from that point; inside it follows the surface normal outward. When
/// the horizontal direction degenerates the push is away from the
/// collider's origin.
pub fn sphere_mesh_contact(
    pos: Vec3,
    radius: f32,
    mesh: &MeshCollider,
    cfg: &CollisionTuning,
) -> Option<Contact> {
    let reach = radius + cfg.epsilon;
    let bounds = mesh.bounds();
    if bounds.is_empty() || bounds.distance_squared(pos) > reach * reach {
        return None;
    }

    let hit = mesh.bvh.closest_point(pos)?;
    let offset = pos - hit.point;
    let inside = offset.dot(hit.normal) < -INSIDE_TOLERANCE;
    if !inside && hit.distance_squared >= reach * reach {
        return None;
    }

    if inside {
        let direction = horizontal_dir(hit.normal)
            .unwrap_or_else(|| away_from_origin(pos, mesh.origin));
        let depth = (hit.point - pos).dot(direction).max(0.0);
        return Some(Contact {
            direction,
            penetration: depth + radius,
        });
    }

    let horizontal = flatten(offset);
    let h_len = horizontal.length();
    if h_len > DEGENERATE_LEN {
        let penetration = radius - h_len;
        return (penetration > 0.0).then(|| Contact {
            direction: horizontal / h_len,
            penetration,
        });
    }

    Some(Contact {
        direction: away_from_origin(pos, mesh.origin),
        penetration: radius,
    })
}

/// Multi-pass resolution against a set of meshes. Each pass visits every
/// mesh and applies `min(penetration, max_push_per_pass)`; passes stop early
/// once a full pass finds no contact.
pub fn resolve_meshes(
    pos: &mut Vec3,
    radius: f32,
    meshes: &[&MeshCollider],
    cfg: &CollisionTuning,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    if meshes.is_empty() {
        report.settled = true;
        return report;
    }

    for _ in 0..cfg.passes.max(1) {
        report.passes += 1;
        let mut touched = false;
        for mesh in meshes {
            if let Some(c) = sphere_mesh_contact(*pos, radius, mesh, cfg) {
                *pos += c.direction * c.penetration.min(cfg.max_push_per_pass);
                report.pushes += 1;
                touched = true;
            }
        }
        if !touched {
            report.settled = true;
            break;
        }
    }
    report
}

/// Resolve an actor against everything registered around it: boxes first,
/// then meshes
pub fn resolve_actor(
    pos: &mut Vec3,
    radius: f32,
    registry: &ColliderRegistry,
    cfg: &CollisionTuning,
) -> ResolveReport {
    let chunk = registry.chunk_of(*pos);
    let box_pushes = resolve_boxes(pos, radius, registry.nearby_boxes(chunk));
    let meshes: Vec<&MeshCollider> = registry.nearby_meshes(chunk).collect();
    let mut report = resolve_meshes(pos, radius, &meshes, cfg);
    report.pushes += box_pushes;
    report
}

fn horizontal_dir(v: Vec3) -> Option<Vec3> {
    let h = flatten(v);
    let len = h.length();
    (len > DEGENERATE_LEN).then(|| h / len)
}

/// Horizontal direction from the collider origin to `pos`, +X if coincident
fn away_from_origin(pos: Vec3, origin: Vec3) -> Vec3 {
    horizontal_dir(pos - origin).unwrap_or(Vec3::X)
}
