//! Owned simulation handle
//!
//! Bundles the field, settings, random source and growth state so drivers
//! only deal with `seed`, `step` and read-only accessors.

use std::fmt;

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::error::SimError;
use crate::settings::GrowthSettings;
use crate::sim::{
    GrowthState, NoiseField, ProjectionParams, ScalarField, StepStats, gradient, gradient_descent,
    tick,
};

/// A seeded growth simulation over a scalar field
pub struct Simulation<F, R = Pcg32> {
    field: F,
    settings: GrowthSettings,
    rng: R,
    state: GrowthState,
}

impl<F, R> fmt::Debug for Simulation<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("settings", &self.settings)
            .field("particles", &self.state.particles.len())
            .field("force_strength", &self.state.force_strength)
            .field("phase", &self.state.phase)
            .finish_non_exhaustive()
    }
}

impl Simulation<NoiseField> {
    /// Noise field and RNG both seeded from `settings`, grown from the origin
    pub fn from_settings(settings: GrowthSettings) -> Result<Self, SimError> {
        let field = NoiseField::from_settings(&settings);
        Self::seed(field, settings, DVec3::ZERO)
    }
}

impl<F: ScalarField> Simulation<F> {
    /// Project `origin` onto the surface and start from that single particle
    ///
    /// Fails with [`SimError::DegenerateSeed`] if `origin` descends into a
    /// basin without a surface; that is fatal for the run.
    pub fn seed(field: F, settings: GrowthSettings, origin: DVec3) -> Result<Self, SimError> {
        let rng = Pcg32::seed_from_u64(settings.rng_seed);
        Self::seed_with_rng(field, settings, origin, rng)
    }
}

impl<F: ScalarField, R: Rng> Simulation<F, R> {
    /// Like [`Simulation::seed`] with an explicit random source
    pub fn seed_with_rng(
        field: F,
        settings: GrowthSettings,
        origin: DVec3,
        rng: R,
    ) -> Result<Self, SimError> {
        settings.validate()?;
        let particle = gradient_descent(&field, origin, &ProjectionParams::from(&settings))?;
        log::info!(
            "Seeded at {particle} (f = {:e}) from {origin}",
            field.evaluate(particle)
        );
        let state = GrowthState::new(particle, settings.force_strength_reset);
        Ok(Self {
            field,
            settings,
            rng,
            state,
        })
    }

    /// Advance by one step
    pub fn step(&mut self) -> StepStats {
        tick::step(&mut self.state, &self.field, &self.settings, &mut self.rng)
    }

    /// Read-only particle snapshot for rendering
    pub fn particles(&self) -> &[DVec3] {
        &self.state.particles
    }

    /// Field gradient (unnormalised surface normal) for shading
    pub fn gradient_at(&self, p: DVec3) -> DVec3 {
        gradient(&self.field, p)
    }

    pub fn force_strength(&self) -> f64 {
        self.state.force_strength
    }

    pub fn is_quiescent(&self) -> bool {
        self.state.is_quiescent()
    }

    pub fn state(&self) -> &GrowthState {
        &self.state
    }

    pub fn settings(&self) -> &GrowthSettings {
        &self.settings
    }

    pub fn field(&self) -> &F {
        &self.field
    }
}
