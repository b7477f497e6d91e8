//! Static colliders and their chunked registry
//!
//! The world's forward axis (-Z) is cut into fixed-length chunks. Each chunk's
//! colliders arrive from a [`GeometryProvider`] once its geometry has loaded and
//! are dropped when the chunk leaves the streaming window. Collision only ever
//! looks at the actor's chunk and its two neighbours.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::{Vec2, Vec3};

use super::geometry::{Aabb, Bvh, TriMesh};
use super::scheduler::SimFault;
use crate::tuning::{ChunkTuning, ValleyTuning};
use crate::xz;

/// Stable collider identifier (survives a chunk being released and reloaded)
pub type ColliderId = u32;

/// Chunk index for a world Z position: `floor(-z / length)`
#[inline]
pub fn chunk_index(z: f32, length: f32) -> i32 {
    (-z / length).floor() as i32
}

/// A static mesh with a precomputed BVH (mountains, structures, monuments)
#[derive(Debug, Clone)]
pub struct MeshCollider {
    pub id: ColliderId,
    /// Root position of the object; fallback push origin for degenerate contacts
    pub origin: Vec3,
    pub bvh: Bvh,
}

impl MeshCollider {
    pub fn new(id: ColliderId, origin: Vec3, mesh: &TriMesh) -> Self {
        Self {
            id,
            origin,
            bvh: Bvh::build(mesh),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bvh.aabb()
    }
}

/// An axis-aligned rectangle on the ground plane (podium markers)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollider {
    pub id: ColliderId,
    /// Minimum corner in (x, z)
    pub min: Vec2,
    /// Maximum corner in (x, z)
    pub max: Vec2,
}

impl BoxCollider {
    /// Box centred on `center` (x, z) with the given footprint
    pub fn centered(id: ColliderId, center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            id,
            min: center - half,
            max: center + half,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

#[derive(Debug, Clone)]
pub enum StaticCollider {
    Mesh(MeshCollider),
    Box(BoxCollider),
}

impl StaticCollider {
    pub fn id(&self) -> ColliderId {
        match self {
            StaticCollider::Mesh(m) => m.id,
            StaticCollider::Box(b) => b.id,
        }
    }
}

/// Colliders for one chunk, as delivered by a provider
#[derive(Debug, Clone)]
pub struct ChunkGeometry {
    pub chunk: i32,
    pub colliders: Vec<StaticCollider>,
}

/// Chunk → collider membership.
///
/// A chunk with nothing registered (not loaded yet, or already released)
/// simply contributes no colliders.
#[derive(Debug, Clone)]
pub struct ColliderRegistry {
    chunk_length: f32,
    chunks: HashMap<i32, Vec<StaticCollider>>,
    /// Podium markers already used up; persists across chunk reloads
    collected: HashSet<ColliderId>,
}

impl ColliderRegistry {
    pub fn new(chunk_length: f32) -> Self {
        Self {
            chunk_length,
            chunks: HashMap::new(),
            collected: HashSet::new(),
        }
    }

    pub fn chunk_length(&self) -> f32 {
        self.chunk_length
    }

    /// Replace the colliders registered for `chunk`. A chunk holding an
    /// empty mesh, non-finite bounds or an inverted box is rejected whole.
    pub fn register(&mut self, chunk: i32, colliders: Vec<StaticCollider>) -> Result<(), SimFault> {
        for collider in &colliders {
            check_collider(collider).map_err(|reason| SimFault::ColliderInvariant {
                reason: format!("chunk {}: {}", chunk, reason),
            })?;
        }
        log::debug!("Chunk {} registered {} colliders", chunk, colliders.len());
        self.chunks.insert(chunk, colliders);
        Ok(())
    }

    /// Forget a chunk's colliders; releasing an unknown chunk is a no-op
    pub fn release(&mut self, chunk: i32) {
        if self.chunks.remove(&chunk).is_some() {
            log::debug!("Chunk {} released", chunk);
        }
    }

    pub fn loaded_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_of(&self, pos: Vec3) -> i32 {
        chunk_index(pos.z, self.chunk_length)
    }

    /// Colliders in `chunk` and its immediate neighbours, in chunk order
    pub fn nearby(&self, chunk: i32) -> impl Iterator<Item = &StaticCollider> + '_ {
        (chunk - 1..=chunk + 1)
            .filter_map(move |c| self.chunks.get(&c))
            .flatten()
    }

    /// Nearby mesh colliders
    pub fn nearby_meshes(&self, chunk: i32) -> impl Iterator<Item = &MeshCollider> + '_ {
        self.nearby(chunk).filter_map(|c| match c {
            StaticCollider::Mesh(m) => Some(m),
            StaticCollider::Box(_) => None,
        })
    }

    /// Nearby box colliders that have not been collected
    pub fn nearby_boxes(&self, chunk: i32) -> impl Iterator<Item = &BoxCollider> + '_ {
        self.nearby(chunk).filter_map(move |c| match c {
            StaticCollider::Box(b) if !self.collected.contains(&b.id) => Some(b),
            _ => None,
        })
    }

    pub fn mark_collected(&mut self, id: ColliderId) -> bool {
        self.collected.insert(id)
    }

    pub fn is_collected(&self, id: ColliderId) -> bool {
        self.collected.contains(&id)
    }

    /// Closest uncollected marker around `pos` (ground-plane distance)
    pub fn nearest_uncollected_marker(&self, pos: Vec3) -> Option<ColliderId> {
        let p = xz(pos);
        self.nearby_boxes(self.chunk_of(pos))
            .min_by(|a, b| {
                a.center()
                    .distance_squared(p)
                    .total_cmp(&b.center().distance_squared(p))
            })
            .map(|b| b.id)
    }
}

/// Source of per-chunk collider sets.
///
/// Loading is asynchronous from the simulation's point of view: `request`
/// starts a load and finished chunks are picked up by `poll_ready`, which the
/// simulation calls once per fixed step.
pub trait GeometryProvider {
    fn request(&mut self, chunk: i32);
    fn release(&mut self, chunk: i32);
    fn poll_ready(&mut self) -> Vec<ChunkGeometry>;
}

/// Sliding window of live chunk indices around the player
#[derive(Debug, Clone)]
pub struct ChunkWindow {
    behind: i32,
    ahead: i32,
    base: Option<i32>,
}

impl ChunkWindow {
    pub fn new(cfg: &ChunkTuning) -> Self {
        Self {
            behind: cfg.behind as i32,
            ahead: cfg.ahead as i32,
            base: None,
        }
    }

    pub fn base(&self) -> Option<i32> {
        self.base
    }

    /// Live range for a base index
    pub fn range(&self, base: i32) -> std::ops::Range<i32> {
        base - self.behind..base + self.ahead
    }

    /// Move the window to `base`. Returns `(entered, released)`; both empty
    /// when the base is unchanged.
    pub fn update(&mut self, base: i32) -> (Vec<i32>, Vec<i32>) {
        if self.base == Some(base) {
            return (Vec::new(), Vec::new());
        }
        let next = self.range(base);
        let (entered, released) = match self.base {
            None => (next.collect(), Vec::new()),
            Some(old) => {
                let prev = self.range(old);
                let entered = next.clone().filter(|c| !prev.contains(c)).collect();
                let released = prev.filter(|c| !next.contains(c)).collect();
                (entered, released)
            }
        };
        self.base = Some(base);
        (entered, released)
    }
}

/// Apply chunk lifecycle for the player's current Z: pick up finished loads,
/// then request/release as the window slides. Loads that finish for chunks
/// outside the window are dropped. Fails on the first malformed chunk.
pub fn stream_chunks<P: GeometryProvider + ?Sized>(
    player_z: f32,
    window: &mut ChunkWindow,
    provider: &mut P,
    registry: &mut ColliderRegistry,
) -> Result<(), SimFault> {
    let base = chunk_index(player_z, registry.chunk_length());
    let (entered, released) = window.update(base);
    for chunk in released {
        provider.release(chunk);
        registry.release(chunk);
    }
    for chunk in entered {
        provider.request(chunk);
    }

    let live = window.range(base);
    for ready in provider.poll_ready() {
        if live.contains(&ready.chunk) {
            registry.register(ready.chunk, ready.colliders)?;
        } else {
            log::debug!("Dropping late geometry for chunk {}", ready.chunk);
        }
    }
    Ok(())
}

fn check_collider(collider: &StaticCollider) -> Result<(), String> {
    match collider {
        StaticCollider::Mesh(m) => {
            if m.bvh.triangle_count() == 0 {
                return Err(format!("mesh {} has no triangles", m.id));
            }
            let bounds = m.bounds();
            if !bounds.min.is_finite() || !bounds.max.is_finite() || !m.origin.is_finite() {
                return Err(format!("mesh {} has non-finite geometry", m.id));
            }
        }
        StaticCollider::Box(b) => {
            if !b.min.is_finite() || !b.max.is_finite() || b.min.cmpgt(b.max).any() {
                return Err(format!("box {} is inverted or non-finite", b.id));
            }
        }
    }
    Ok(())
}

/// Procedural fantasy valley: mountain cones along both sides, podium markers
/// along the path and a single monument.
///
/// Geometry becomes ready `latency_polls` polls after it is requested.
#[derive(Debug, Clone)]
pub struct ProceduralValley {
    layout: ValleyTuning,
    chunk_length: f32,
    latency_polls: u32,
    pending: VecDeque<(i32, u32)>,
}

impl ProceduralValley {
    pub fn new(layout: ValleyTuning, chunk_length: f32) -> Self {
        Self {
            layout,
            chunk_length,
            latency_polls: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency_polls = polls;
        self
    }

    /// Colliders owned by `chunk`
    pub fn build_chunk(&self, chunk: i32) -> Vec<StaticCollider> {
        let layout = &self.layout;
        let len = self.chunk_length;
        let chunk_start = -(chunk as f32) * len;
        let chunk_end = chunk_start - len;
        let mut out = Vec::new();
        let mut slot = 0u32;

        // Mountain bands evenly spaced through the chunk, one cone per side
        let bands = layout.mountain_bands.max(1);
        for i in 0..bands {
            let z = chunk_start - (i as f32) * len / (bands as f32);
            for side in [-1.0_f32, 1.0] {
                let base = Vec3::new(side * layout.mountain_x, 0.0, z);
                let mesh = TriMesh::cone(
                    base,
                    layout.mountain_radius,
                    layout.mountain_height,
                    layout.mountain_sides,
                );
                out.push(StaticCollider::Mesh(MeshCollider::new(
                    mesh_id(chunk, slot),
                    base,
                    &mesh,
                )));
                slot += 1;
            }
        }

        // Podium markers: z = -spacing * i (i >= 1), alternating sides
        if layout.podium_spacing > 0.0 {
            let first = ((-chunk_start) / layout.podium_spacing).ceil().max(1.0) as u32;
            let mut i = first;
            loop {
                let z = -(i as f32) * layout.podium_spacing;
                if z <= chunk_end {
                    break;
                }
                if z <= chunk_start {
                    let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                    out.push(StaticCollider::Box(BoxCollider::centered(
                        marker_id(i),
                        Vec2::new(side * layout.podium_x, z),
                        Vec2::splat(layout.podium_size),
                    )));
                }
                i += 1;
            }
        }

        if chunk_index(layout.monument_z, len) == chunk {
            let center = Vec3::new(layout.monument_x, layout.monument_y, layout.monument_z);
            let mesh = TriMesh::icosphere(center, layout.monument_radius, 0);
            out.push(StaticCollider::Mesh(MeshCollider::new(
                mesh_id(chunk, slot),
                Vec3::new(center.x, 0.0, center.z),
                &mesh,
            )));
        }

        out
    }
}

impl GeometryProvider for ProceduralValley {
    fn request(&mut self, chunk: i32) {
        if !self.pending.iter().any(|(c, _)| *c == chunk) {
            self.pending.push_back((chunk, self.latency_polls));
        }
    }

    fn release(&mut self, chunk: i32) {
        self.pending.retain(|(c, _)| *c != chunk);
    }

    fn poll_ready(&mut self) -> Vec<ChunkGeometry> {
        let mut ready = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.pending.len());
        while let Some((chunk, remaining)) = self.pending.pop_front() {
            if remaining == 0 {
                ready.push(ChunkGeometry {
                    chunk,
                    colliders: self.build_chunk(chunk),
                });
            } else {
                waiting.push_back((chunk, remaining - 1));
            }
        }
        self.pending = waiting;
        ready
    }
}

/// Mesh ids pack the chunk and slot; markers live in the top half of the id space
fn mesh_id(chunk: i32, slot: u32) -> ColliderId {
    ((chunk as u32) << 8 | (slot & 0xff)) & 0x7fff_ffff
}

fn marker_id(podium_index: u32) -> ColliderId {
    0x8000_0000 | podium_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn valley() -> ProceduralValley {
        let t = Tuning::default();
        ProceduralValley::new(t.valley.clone(), t.chunks.length)
    }

    #[test]
    fn test_chunk_index() {
        assert_eq!(chunk_index(0.0, 40.0), 0);
        assert_eq!(chunk_index(-39.9, 40.0), 0);
        assert_eq!(chunk_index(-40.0, 40.0), 1);
        assert_eq!(chunk_index(5.0, 40.0), -1);
    }

    #[test]
    fn test_window_enter_release() {
        let mut window = ChunkWindow::new(&ChunkTuning {
            length: 40.0,
            behind: 2,
            ahead: 3,
        });
        let (entered, released) = window.update(0);
        assert_eq!(entered, vec![-2, -1, 0, 1, 2]);
        assert!(released.is_empty());

        let (entered, released) = window.update(0);
        assert!(entered.is_empty() && released.is_empty());

        let (entered, released) = window.update(1);
        assert_eq!(entered, vec![3]);
        assert_eq!(released, vec![-2]);
    }

    #[test]
    fn test_registry_tolerates_unloaded_chunks() {
        let mut reg = ColliderRegistry::new(40.0);
        assert_eq!(reg.nearby(5).count(), 0);
        reg.release(5);
        reg.register(5, valley().build_chunk(5)).expect("valid chunk");
        assert!(reg.nearby(4).count() > 0);
        assert!(reg.nearby(6).count() > 0);
        assert_eq!(reg.nearby(8).count(), 0);
    }

    #[test]
    fn test_malformed_chunk_is_rejected() {
        let mut reg = ColliderRegistry::new(40.0);
        let empty = MeshCollider::new(3, Vec3::ZERO, &TriMesh::new(Vec::new()));
        let err = reg
            .register(2, vec![StaticCollider::Mesh(empty)])
            .unwrap_err();
        assert!(matches!(err, SimFault::ColliderInvariant { .. }));
        assert_eq!(reg.loaded_chunks(), 0);

        let inverted = BoxCollider {
            id: 9,
            min: Vec2::new(1.0, 1.0),
            max: Vec2::new(0.0, 2.0),
        };
        let mut colliders = valley().build_chunk(2);
        colliders.push(StaticCollider::Box(inverted));
        assert!(reg.register(2, colliders).is_err());
        assert_eq!(reg.nearby(2).count(), 0);
    }

    #[test]
    fn test_valley_chunk_contents() {
        let v = valley();
        let chunk0 = v.build_chunk(0);
        let meshes = chunk0
            .iter()
            .filter(|c| matches!(c, StaticCollider::Mesh(_)))
            .count();
        assert_eq!(meshes, 14);
        // Podium at z = -26 belongs to chunk 0
        let boxes: Vec<_> = chunk0
            .iter()
            .filter_map(|c| match c {
                StaticCollider::Box(b) => Some(*b),
                _ => None,
            })
            .collect();
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].center().y + 26.0).abs() < 1e-4);
        assert!((boxes[0].center().x + 3.8).abs() < 1e-4);

        // Monument at z = -320 belongs to chunk 8
        let chunk8 = v.build_chunk(8);
        assert_eq!(
            chunk8
                .iter()
                .filter(|c| matches!(c, StaticCollider::Mesh(_)))
                .count(),
            15
        );
    }

    #[test]
    fn test_marker_ids_unique_across_chunks() {
        let v = valley();
        let mut seen = HashSet::new();
        for chunk in -2..20 {
            for c in v.build_chunk(chunk) {
                assert!(seen.insert(c.id()), "duplicate id {}", c.id());
            }
        }
    }

    #[test]
    fn test_provider_latency_and_late_drop() {
        let mut provider = valley().with_latency(2);
        let mut window = ChunkWindow::new(&ChunkTuning {
            length: 40.0,
            behind: 1,
            ahead: 2,
        });
        let mut reg = ColliderRegistry::new(40.0);

        stream_chunks(0.0, &mut window, &mut provider, &mut reg).expect("stream");
        assert_eq!(reg.loaded_chunks(), 0);
        stream_chunks(0.0, &mut window, &mut provider, &mut reg).expect("stream");
        assert_eq!(reg.loaded_chunks(), 0);
        stream_chunks(0.0, &mut window, &mut provider, &mut reg).expect("stream");
        assert_eq!(reg.loaded_chunks(), 3);

        // Jump far ahead: old chunks are released, new ones pending
        stream_chunks(-400.0, &mut window, &mut provider, &mut reg).expect("stream");
        assert_eq!(reg.loaded_chunks(), 0);
    }

    #[test]
    fn test_collected_markers_stop_reporting() {
        let mut reg = ColliderRegistry::new(40.0);
        reg.register(0, valley().build_chunk(0)).expect("valid chunk");
        let pos = Vec3::new(-3.0, 0.0, -25.0);
        let id = reg.nearest_uncollected_marker(pos).expect("marker nearby");
        assert!(reg.mark_collected(id));
        assert!(!reg.mark_collected(id));
        assert_eq!(reg.nearby_boxes(0).count(), 0);

        // Reloading the chunk keeps it collected
        reg.release(0);
        reg.register(0, valley().build_chunk(0)).expect("valid chunk");
        assert!(reg.is_collected(id));
        assert_eq!(reg.nearby_boxes(0).count(), 0);
    }
}
