//! Growth state and per-step statistics
//!
//! Everything that changes from one step to the next lives in [`GrowthState`].
//! The octree is not part of it: it is rebuilt from `particles` every step.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Current phase of the growth loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GrowthPhase {
    /// Repelling and inserting particles
    #[default]
    Growing,
    /// Force strength has decayed below tolerance²; steps are no-ops
    Quiescent,
}

/// Diagnostics returned by every step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    /// Step counter after this step
    pub step: u64,
    pub average_neighbors: f64,
    /// Median nearest-neighbour distance measured before moving
    pub median_separation: f64,
    pub most_isolated_distance: f64,
    pub particle_count: usize,
    /// Force strength after this step's reset/decay
    pub force_strength: f64,
    /// A particle was added this step
    pub inserted: bool,
    /// Particles held in place because re-projection failed
    pub reverted: usize,
    /// Repulsion and growth were skipped
    pub quiescent: bool,
}

impl fmt::Display for StepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {:>6} | particles {:>6} | neighbours {:>5.2} | median {:.5} | isolated {:.5} | force {:.3e}",
            self.step,
            self.particle_count,
            self.average_neighbors,
            self.median_separation,
            self.most_isolated_distance,
            self.force_strength,
        )?;
        if self.inserted {
            write!(f, " | +1")?;
        }
        if self.reverted > 0 {
            write!(f, " | reverted {}", self.reverted)?;
        }
        if self.quiescent {
            write!(f, " | quiescent")?;
        }
        Ok(())
    }
}

/// Mutable simulation state (owned, never shared)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthState {
    /// Particles on the surface, in insertion order
    pub particles: Vec<DVec3>,
    /// Repulsion strength; decays every step, reset on insertion
    pub force_strength: f64,
    /// Index of the most recently inserted particle
    pub last_inserted: Option<usize>,
    /// Steps taken since seeding
    pub step_count: u64,
    pub phase: GrowthPhase,
    /// Statistics of the last step that actually ran
    #[serde(skip)]
    pub last_stats: StepStats,
}

impl GrowthState {
    /// State holding only the seed particle
    pub fn new(seed_particle: DVec3, force_strength: f64) -> Self {
        Self {
            particles: vec![seed_particle],
            force_strength,
            last_inserted: None,
            step_count: 0,
            phase: GrowthPhase::Growing,
            last_stats: StepStats {
                particle_count: 1,
                force_strength,
                ..Default::default()
            },
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn is_quiescent(&self) -> bool {
        self.phase == GrowthPhase::Quiescent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_seed_only() {
        let state = GrowthState::new(DVec3::new(0.5, 0.0, 0.0), 0.001);
        assert_eq!(state.particle_count(), 1);
        assert_eq!(state.step_count, 0);
        assert!(!state.is_quiescent());
        assert_eq!(state.last_stats.particle_count, 1);
    }

    #[test]
    fn test_stats_display_flags() {
        let stats = StepStats {
            step: 12,
            particle_count: 40,
            inserted: true,
            reverted: 2,
            ..Default::default()
        };
        let line = stats.to_string();
        assert!(line.contains("particles     40"));
        assert!(line.contains("+1"));
        assert!(line.contains("reverted 2"));
        assert!(!line.contains("quiescent"));
    }

    #[test]
    fn test_state_snapshot_skips_stats() {
        let mut state = GrowthState::new(DVec3::Y, 0.5);
        state.last_stats.step = 99;
        let json = serde_json::to_string(&state).unwrap();
        let restored: GrowthState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.particles, state.particles);
        assert_eq!(restored.last_stats.step, 0);
    }
}
