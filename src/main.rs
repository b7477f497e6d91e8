//! Twinworld headless runner
//!
//! Drives a scripted session through the fixed-step scheduler with jittery
//! frame deltas and logs what happened. Usage: `twinworld [tuning.json]`.

use twinworld::Tuning;
use twinworld::sim::{
    CurrencySource, GameEvent, Phase, ProceduralValley, RewardSink, StepInput, WorldKind,
    WorldSession,
};

/// Simulated wall-clock seconds
const RUN_SECONDS: f64 = 120.0;
/// Frame deltas cycle through these (seconds)
const FRAME_PATTERN: [f64; 5] = [1.0 / 60.0, 1.0 / 30.0, 1.0 / 144.0, 0.05, 1.0 / 90.0];
/// One tap every this many frames
const TAP_EVERY: u64 = 20;

#[derive(Default)]
struct Ledger {
    tap: f64,
    kill: f64,
    auto: f64,
    kills: u32,
    bosses: u32,
}

impl RewardSink for Ledger {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::CurrencyEarned { source, amount } => match source {
                CurrencySource::Tap => self.tap += amount,
                CurrencySource::Kill => self.kill += amount,
                CurrencySource::Auto => self.auto += amount,
            },
            GameEvent::EnemyKilled { .. } => self.kills += 1,
            GameEvent::BossDefeated { tier, boost_target, .. } => {
                self.bosses += 1;
                log::info!("Boss down, now tier {} (boosting {:?})", tier, boost_target);
            }
            _ => {}
        }
    }
}

fn load_tuning() -> Result<Tuning, twinworld::TuningError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading tuning from {}", path);
            Tuning::load(path)
        }
        None => Ok(Tuning::default()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let tuning = match load_tuning() {
        Ok(t) => t,
        Err(e) => {
            log::error!("Bad tuning: {}", e);
            std::process::exit(1);
        }
    };

    let provider = ProceduralValley::new(tuning.valley.clone(), tuning.chunks.length).with_latency(2);
    let mut session = WorldSession::new(WorldKind::Fantasy, 0x5eed, tuning, provider);
    let mut ledger = Ledger::default();
    let mut input = StepInput {
        auto_walk: true,
        auto_attack: true,
        tap_gain: 1.0,
        auto_gain_per_sec: 0.5,
        ..Default::default()
    };

    let mut elapsed = 0.0;
    let mut frame = 0u64;
    while elapsed < RUN_SECONDS && !session.is_halted() {
        let dt = FRAME_PATTERN[(frame % FRAME_PATTERN.len() as u64) as usize];
        if frame % TAP_EVERY == 0 {
            input.shoot_pulse += 1;
        }
        session.frame(dt, &input, &mut ledger);

        let snap = session.snapshot();
        match snap.phase {
            Phase::PodiumBlocking => {
                session.choose_podium(0, &mut ledger);
            }
            Phase::Idle if snap.boss_health.is_some() => {
                session.engage_boss(&mut ledger);
            }
            _ => {}
        }

        elapsed += dt;
        frame += 1;
    }

    let snap = session.snapshot();
    if let Some(fault) = session.fault() {
        log::error!("Run stopped early: {}", fault);
    }
    log::info!(
        "{} frames, {} steps, player at z {:.1}",
        frame,
        snap.time_ticks,
        snap.player_pos.z
    );
    log::info!(
        "Kills {} (podiums {}, bosses {}), tier {}, upgrades {:?}",
        ledger.kills,
        snap.podiums,
        ledger.bosses,
        snap.tier,
        snap.upgrades
    );
    log::info!(
        "Currency: tap {:.1}, kill {:.1}, auto {:.1}",
        ledger.tap,
        ledger.kill,
        ledger.auto
    );
    match serde_json::to_string_pretty(&snap) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Snapshot not serializable: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
