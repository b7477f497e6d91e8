//! World session: the per-frame entry point
//!
//! Owns the world, its scheduler, the collider registry and the geometry
//! provider. Each render callback hands over the frame delta and the latest
//! input; events produced by the steps are forwarded to the reward sink.

use super::colliders::{ChunkWindow, ColliderRegistry, GeometryProvider, stream_chunks};
use super::scheduler::{FixedStepScheduler, SimFault};
use super::state::{GameEvent, Snapshot, StepInput, World, WorldKind};
use super::tick::tick;
use crate::camera::CameraPose;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::tuning::Tuning;

/// Receives currency, podium and boss notifications
pub trait RewardSink {
    fn on_event(&mut self, event: &GameEvent);
}

impl RewardSink for Vec<GameEvent> {
    fn on_event(&mut self, event: &GameEvent) {
        self.push(event.clone());
    }
}

/// Receives the fault that halted a session
pub trait DiagnosticSink {
    fn report(&mut self, fault: &SimFault, step: u64);
}

/// Diagnostics through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn report(&mut self, fault: &SimFault, step: u64) {
        log::error!("World session halted at step {}: {}", step, fault);
    }
}

pub struct WorldSession<P: GeometryProvider> {
    world: World,
    scheduler: FixedStepScheduler,
    registry: ColliderRegistry,
    window: ChunkWindow,
    provider: P,
    diagnostics: Box<dyn DiagnosticSink>,
    fault_reported: bool,
}

impl<P: GeometryProvider> WorldSession<P> {
    pub fn new(kind: WorldKind, seed: u64, tuning: Tuning, provider: P) -> Self {
        let registry = ColliderRegistry::new(tuning.chunks.length);
        let window = ChunkWindow::new(&tuning.chunks);
        log::info!("Starting {:?} session (seed {})", kind, seed);
        Self {
            world: World::new(kind, seed, tuning),
            scheduler: FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS),
            registry,
            window,
            provider,
            diagnostics: Box::new(LogDiagnostics),
            fault_reported: false,
        }
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// Advance by a frame's wall-clock delta (seconds). Returns the number of
    /// fixed steps run.
    pub fn frame(&mut self, frame_dt: f64, input: &StepInput, sink: &mut dyn RewardSink) -> u32 {
        let Self {
            world,
            scheduler,
            registry,
            window,
            provider,
            ..
        } = self;

        let steps = scheduler.advance(frame_dt, |dt| {
            stream_chunks(world.player.pos.z, window, provider, registry)?;
            tick(world, input, registry, dt)
        });

        self.flush(sink);
        if !self.fault_reported {
            if let Some(fault) = self.scheduler.fault() {
                self.diagnostics.report(fault, self.scheduler.total_steps());
                self.fault_reported = true;
            }
        }
        steps
    }

    /// Apply podium choice `index`. The nearest podium marker is used up.
    pub fn choose_podium(&mut self, index: usize, sink: &mut dyn RewardSink) -> bool {
        if self.is_halted() {
            return false;
        }
        let chosen = self
            .world
            .progression
            .choose_podium(index, &mut self.world.events)
            .is_some();
        if chosen {
            if let Some(marker) = self.registry.nearest_uncollected_marker(self.world.player.pos) {
                self.registry.mark_collected(marker);
                log::debug!("Podium marker {} collected", marker);
            }
        }
        self.flush(sink);
        chosen
    }

    /// Re-open a parked monument boss
    pub fn engage_boss(&mut self, sink: &mut dyn RewardSink) -> bool {
        if self.is_halted() {
            return false;
        }
        let engaged = self.world.progression.engage_boss(&mut self.world.events);
        self.flush(sink);
        engaged
    }

    /// Leave the monument boss fight; its health is kept
    pub fn retreat_boss(&mut self, sink: &mut dyn RewardSink) -> bool {
        if self.is_halted() {
            return false;
        }
        let retreated = self.world.progression.retreat_boss(&mut self.world.events);
        self.flush(sink);
        retreated
    }

    pub fn snapshot(&self) -> Snapshot {
        self.world.snapshot()
    }

    /// First-person camera for the latest step
    pub fn camera(&self) -> CameraPose {
        let p = &self.world.player;
        CameraPose::first_person(p.pos, p.yaw, p.pitch)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn registry(&self) -> &ColliderRegistry {
        &self.registry
    }

    pub fn is_halted(&self) -> bool {
        self.scheduler.is_halted()
    }

    pub fn fault(&self) -> Option<&SimFault> {
        self.scheduler.fault()
    }

    fn flush(&mut self, sink: &mut dyn RewardSink) {
        for event in self.world.events.drain(..) {
            sink.on_event(&event);
        }
    }
}
