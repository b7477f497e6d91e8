//! Fixed-step scheduler
//!
//! Converts variable frame deltas into whole fixed steps. At most
//! `max_steps` run per frame; the remainder stays in the accumulator and is
//! worked off over the following frames. A step that returns a fault halts
//! the scheduler for good.

use thiserror::Error;

/// Accumulated time within this of a full step counts as a full step
const STEP_TOLERANCE: f64 = 1e-9;

/// Broken numeric invariant detected during a step
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimFault {
    #[error("non-finite value in {what}")]
    NonFinite { what: &'static str },
    #[error("collider invariant violated: {reason}")]
    ColliderInvariant { reason: String },
}

#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    step_dt: f32,
    max_steps: u32,
    accumulator: f64,
    total_steps: u64,
    fault: Option<SimFault>,
}

impl FixedStepScheduler {
    pub fn new(step_dt: f32, max_steps: u32) -> Self {
        Self {
            step_dt,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
            total_steps: 0,
            fault: None,
        }
    }

    pub fn step_dt(&self) -> f32 {
        self.step_dt
    }

    /// Time banked but not yet simulated
    pub fn pending_time(&self) -> f64 {
        self.accumulator
    }

    /// Steps executed since creation
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<&SimFault> {
        self.fault.as_ref()
    }

    /// Bank `frame_dt` and run up to `max_steps` fixed steps. Returns the
    /// number of steps run. Negative or non-finite deltas count as zero.
    pub fn advance<F>(&mut self, frame_dt: f64, mut step: F) -> u32
    where
        F: FnMut(f32) -> Result<(), SimFault>,
    {
        if self.is_halted() {
            return 0;
        }

        if frame_dt.is_finite() && frame_dt >= 0.0 {
            self.accumulator += frame_dt;
        } else {
            log::warn!("Ignoring invalid frame delta {}", frame_dt);
        }

        let step_dt = f64::from(self.step_dt);
        let mut ran = 0;
        while ran < self.max_steps && self.accumulator + STEP_TOLERANCE >= step_dt {
            self.accumulator = (self.accumulator - step_dt).max(0.0);
            ran += 1;
            self.total_steps += 1;
            if let Err(fault) = step(self.step_dt) {
                log::error!("Simulation halted at step {}: {}", self.total_steps, fault);
                self.fault = Some(fault);
                break;
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{MAX_SUBSTEPS, SIM_DT};

    fn step_dt() -> f64 {
        f64::from(SIM_DT)
    }

    #[test]
    fn test_whole_steps_only() {
        let mut s = FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS);
        let mut n = 0;
        assert_eq!(s.advance(step_dt() * 0.5, |_| Ok(n += 1)), 0);
        assert_eq!(s.advance(step_dt() * 0.5, |_| Ok(n += 1)), 1);
        assert_eq!(n, 1);
        assert!(s.pending_time() < 1e-6);
    }

    #[test]
    fn test_catch_up_is_capped_and_retained() {
        let mut s = FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS);
        let ran = s.advance(step_dt() * 10.0, |_| Ok(()));
        assert_eq!(ran, MAX_SUBSTEPS);
        assert!((s.pending_time() - step_dt() * 6.0).abs() < 1e-6);

        assert_eq!(s.advance(0.0, |_| Ok(())), 4);
        assert_eq!(s.advance(0.0, |_| Ok(())), 2);
        assert_eq!(s.advance(0.0, |_| Ok(())), 0);
        assert_eq!(s.total_steps(), 10);
    }

    #[test]
    fn test_fault_halts_permanently() {
        let mut s = FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS);
        let mut calls = 0;
        let ran = s.advance(step_dt() * 4.0, |_| {
            calls += 1;
            if calls == 2 {
                Err(SimFault::NonFinite { what: "player position" })
            } else {
                Ok(())
            }
        });
        assert_eq!(ran, 2);
        assert!(s.is_halted());
        assert_eq!(s.advance(1.0, |_| Ok(calls += 1)), 0);
        assert_eq!(calls, 2);
        assert_eq!(
            s.fault(),
            Some(&SimFault::NonFinite { what: "player position" })
        );
    }

    #[test]
    fn test_invalid_frame_delta_ignored() {
        let mut s = FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS);
        assert_eq!(s.advance(f64::NAN, |_| Ok(())), 0);
        assert_eq!(s.advance(-3.0, |_| Ok(())), 0);
        assert_eq!(s.pending_time(), 0.0);
    }

    #[test]
    fn test_granularity_does_not_change_step_count() {
        let mut coarse = FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS);
        let mut fine = FixedStepScheduler::new(SIM_DT, MAX_SUBSTEPS);
        coarse.advance(step_dt() * 600.0, |_| Ok(()));
        while coarse.advance(0.0, |_| Ok(())) > 0 {}
        for _ in 0..1200 {
            fine.advance(step_dt() * 0.5, |_| Ok(()));
        }
        assert_eq!(coarse.total_steps(), 600);
        assert_eq!(fine.total_steps(), 600);
    }
}
