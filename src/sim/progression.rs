//! Podium and monument-boss progression
//!
//! Kill counting drives two gates:
//! - every `kills_per_podium` kills a podium opens with three upgrade choices
//! - every `podiums_per_monument` podiums the monument boss becomes pending;
//!   it opens the moment the last outstanding podium choice is made
//!
//! While a gate is open the world does not spawn, move or shoot. The phase is
//! consulted once at the top of each step.

use serde::{Deserialize, Serialize};

use super::state::{GameEvent, WorldKind};
use crate::tuning::ProgressionTuning;

/// Boss health below this counts as zero
const BOSS_HEALTH_EPSILON: f64 = 1e-9;

/// Gate state of a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Normal play: spawning, motion, combat
    Idle,
    /// Podium upgrade choice on screen
    PodiumBlocking,
    /// Monument boss fight on screen
    BossBlocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    Damage,
    FireRate,
    KillReward,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [UpgradeKind::Damage, UpgradeKind::FireRate, UpgradeKind::KillReward];
}

/// Podium levels bought so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub damage: u32,
    pub fire_rate: u32,
    pub kill_reward: u32,
}

impl Upgrades {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Damage => self.damage,
            UpgradeKind::FireRate => self.fire_rate,
            UpgradeKind::KillReward => self.kill_reward,
        }
    }

    fn level_mut(&mut self, kind: UpgradeKind) -> &mut u32 {
        match kind {
            UpgradeKind::Damage => &mut self.damage,
            UpgradeKind::FireRate => &mut self.fire_rate,
            UpgradeKind::KillReward => &mut self.kill_reward,
        }
    }
}

/// One option offered by an open podium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodiumChoice {
    pub upgrade: UpgradeKind,
    /// Level reached if chosen
    pub next_level: u32,
}

/// The monument boss, open or parked after a retreat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonumentBoss {
    pub health: f64,
    pub max_health: f64,
    /// Tier this boss gates
    pub tier: u32,
}

/// Boss health for a tier at a given podium count. Tiers start at 1.
pub fn boss_health(cfg: &ProgressionTuning, tier: u32, podiums: u32) -> f64 {
    let exponent = i32::try_from(tier.saturating_sub(1)).unwrap_or(i32::MAX);
    cfg.boss_base_health * cfg.boss_health_growth.powi(exponent)
        + cfg.boss_health_per_podium * f64::from(podiums)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    world: WorldKind,
    cfg: ProgressionTuning,
    phase: Phase,
    kills: u64,
    podiums: u32,
    /// Podiums reached whose choice has not been made yet
    pending_podiums: u32,
    monument_pending: bool,
    /// Monuments reached and not yet defeated (the open or parked boss included)
    monuments_owed: u32,
    choices: Vec<PodiumChoice>,
    upgrades: Upgrades,
    boss: Option<MonumentBoss>,
    tier: u32,
    monuments_cleared: u32,
}

impl Progression {
    pub fn new(world: WorldKind, cfg: ProgressionTuning) -> Self {
        Self {
            world,
            cfg,
            phase: Phase::Idle,
            kills: 0,
            podiums: 0,
            pending_podiums: 0,
            monument_pending: false,
            monuments_owed: 0,
            choices: Vec::new(),
            upgrades: Upgrades::default(),
            boss: None,
            tier: 1,
            monuments_cleared: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn kills(&self) -> u64 {
        self.kills
    }

    pub fn podiums(&self) -> u32 {
        self.podiums
    }

    pub fn pending_podiums(&self) -> u32 {
        self.pending_podiums
    }

    pub fn monument_pending(&self) -> bool {
        self.monument_pending
    }

    pub fn monuments_owed(&self) -> u32 {
        self.monuments_owed
    }

    pub fn choices(&self) -> &[PodiumChoice] {
        &self.choices
    }

    pub fn upgrades(&self) -> &Upgrades {
        &self.upgrades
    }

    /// Monument boss, whether open or parked
    pub fn boss(&self) -> Option<&MonumentBoss> {
        self.boss.as_ref()
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn monuments_cleared(&self) -> u32 {
        self.monuments_cleared
    }

    /// Count one kill. Returns true when it reached a podium.
    pub fn record_kill(&mut self, events: &mut Vec<GameEvent>) -> bool {
        self.kills += 1;
        let per_podium = u64::from(self.cfg.kills_per_podium.max(1));
        if self.kills % per_podium != 0 {
            return false;
        }

        self.podiums += 1;
        self.pending_podiums += 1;
        log::info!("Podium {} reached at {} kills", self.podiums, self.kills);
        events.push(GameEvent::PodiumReached {
            podiums: self.podiums,
        });

        if self.podiums % self.cfg.podiums_per_monument.max(1) == 0 {
            self.monument_pending = true;
            self.monuments_owed += 1;
            log::info!(
                "Monument pending after podium {} ({} owed)",
                self.podiums,
                self.monuments_owed
            );
            events.push(GameEvent::MonumentReached {
                podiums: self.podiums,
            });
        }

        if self.phase == Phase::Idle {
            self.open_podium();
        }
        true
    }

    /// Apply podium choice `index`. Out-of-range indices and calls outside a
    /// podium are ignored. Returns the upgrade applied.
    pub fn choose_podium(&mut self, index: usize, events: &mut Vec<GameEvent>) -> Option<UpgradeKind> {
        if self.phase != Phase::PodiumBlocking {
            log::warn!("Podium choice {} ignored in {:?}", index, self.phase);
            return None;
        }
        let Some(choice) = self.choices.get(index).copied() else {
            log::warn!("Podium choice {} out of range ({} offered)", index, self.choices.len());
            return None;
        };

        let level = self.upgrades.level_mut(choice.upgrade);
        *level += 1;
        let level = *level;
        self.pending_podiums = self.pending_podiums.saturating_sub(1);
        log::info!("Podium upgrade {:?} -> level {}", choice.upgrade, level);
        events.push(GameEvent::PodiumChosen {
            upgrade: choice.upgrade,
            level,
        });

        if self.pending_podiums > 0 {
            self.open_podium();
        } else if self.monument_pending {
            self.monument_pending = false;
            self.choices.clear();
            self.open_boss(events);
        } else {
            self.choices.clear();
            self.phase = Phase::Idle;
        }
        Some(choice.upgrade)
    }

    /// Re-open a parked boss. No-op unless idle with a parked boss.
    pub fn engage_boss(&mut self, events: &mut Vec<GameEvent>) -> bool {
        match (self.phase, self.boss.is_some()) {
            (Phase::Idle, true) => {
                self.open_boss(events);
                true
            }
            (Phase::BossBlocking, _) => {
                log::warn!("Boss already open");
                false
            }
            _ => {
                log::warn!("No boss to engage in {:?}", self.phase);
                false
            }
        }
    }

    /// Leave an open boss fight. Health is kept for the next engagement.
    pub fn retreat_boss(&mut self, events: &mut Vec<GameEvent>) -> bool {
        let Some(boss) = self.boss.filter(|_| self.phase == Phase::BossBlocking) else {
            log::warn!("Retreat ignored in {:?}", self.phase);
            return false;
        };
        self.phase = Phase::Idle;
        log::info!("Retreated from monument boss at {:.1} health", boss.health);
        events.push(GameEvent::BossRetreated {
            health: boss.health,
        });
        true
    }

    /// Damage the open boss. Returns true on the transition to zero health.
    pub fn damage_boss(&mut self, amount: f64, events: &mut Vec<GameEvent>) -> bool {
        if self.phase != Phase::BossBlocking || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        let Some(boss) = self.boss.as_mut() else {
            return false;
        };

        boss.health -= amount;
        if boss.health > BOSS_HEALTH_EPSILON {
            return false;
        }

        self.boss = None;
        self.tier += 1;
        self.monuments_cleared += 1;
        self.monuments_owed = self.monuments_owed.saturating_sub(1);
        let boost_target = self.world.other();
        log::info!(
            "Monument boss defeated: tier {}, {} cleared, boosting {:?}",
            self.tier,
            self.monuments_cleared,
            boost_target
        );
        events.push(GameEvent::BossDefeated {
            tier: self.tier,
            monuments_cleared: self.monuments_cleared,
            boost_target,
        });

        if self.pending_podiums > 0 {
            // The next owed monument waits for the outstanding choices
            if self.monuments_owed > 0 {
                self.monument_pending = true;
            }
            self.open_podium();
        } else if self.monuments_owed > 0 {
            self.open_boss(events);
        } else {
            self.phase = Phase::Idle;
        }
        true
    }

    fn open_podium(&mut self) {
        self.choices = UpgradeKind::ALL
            .iter()
            .map(|&upgrade| PodiumChoice {
                upgrade,
                next_level: self.upgrades.level(upgrade) + 1,
            })
            .collect();
        self.phase = Phase::PodiumBlocking;
    }

    pub(crate) fn open_boss(&mut self, events: &mut Vec<GameEvent>) {
        let boss = match self.boss {
            Some(parked) => parked,
            None => {
                let health = boss_health(&self.cfg, self.tier, self.podiums);
                MonumentBoss {
                    health,
                    max_health: health,
                    tier: self.tier,
                }
            }
        };
        self.boss = Some(boss);
        self.phase = Phase::BossBlocking;
        log::info!("Monument boss open: {:.1}/{:.1} (tier {})", boss.health, boss.max_health, boss.tier);
        events.push(GameEvent::BossOpened {
            health: boss.health,
            max_health: boss.max_health,
            tier: boss.tier,
        });
    }

    /// Replace the boss pool (scenario setup)
    #[cfg(test)]
    pub(crate) fn set_boss_health(&mut self, health: f64) {
        self.boss = Some(MonumentBoss {
            health,
            max_health: health,
            tier: self.tier,
        });
    }
}
