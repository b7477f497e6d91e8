//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod colliders;
pub mod collision;
pub mod combat;
pub mod enemy;
pub mod geometry;
pub mod motion;
pub mod progression;
pub mod scheduler;
pub mod session;
pub mod spawn;
pub mod state;
pub mod summon;
pub mod tick;

pub use colliders::{
    BoxCollider, ChunkGeometry, ChunkWindow, ColliderId, ColliderRegistry, GeometryProvider,
    MeshCollider, ProceduralValley, StaticCollider, stream_chunks,
};
pub use collision::{Contact, ResolveReport, resolve_actor};
pub use combat::{DamageSource, Projectile};
pub use enemy::{Enemy, EnemyKind};
pub use geometry::{Aabb, Bvh, TriMesh, Triangle};
pub use progression::{MonumentBoss, Phase, PodiumChoice, Progression, UpgradeKind, Upgrades};
pub use scheduler::{FixedStepScheduler, SimFault};
pub use session::{DiagnosticSink, LogDiagnostics, RewardSink, WorldSession};
pub use state::{CurrencySource, GameEvent, Player, Snapshot, StepInput, World, WorldKind};
pub use summon::{Summon, SummonMode};
pub use tick::tick;
