//! Scalar fields and their numerical gradient
//!
//! The surface being tiled is the zero level-set of a [`ScalarField`]. Fields
//! are black-box oracles: gradients are always estimated by finite differences.

use glam::DVec3;
use noise::{NoiseFn, OpenSimplex, ScaleBias};

use crate::consts::GRADIENT_STEP;
use crate::settings::GrowthSettings;

/// A pure function from space to a signed scalar
pub trait ScalarField {
    fn evaluate(&self, p: DVec3) -> f64;
}

impl<F> ScalarField for F
where
    F: Fn(DVec3) -> f64,
{
    #[inline]
    fn evaluate(&self, p: DVec3) -> f64 {
        self(p)
    }
}

/// Peak magnitude of 3-D `OpenSimplex`, which stays well inside [-1, 1]
pub const OPEN_SIMPLEX_AMPLITUDE: f64 = 0.54;

/// Seeded simplex noise remapped to [0, 1] and offset by the level curve
///
/// `evaluate(p) = 0.5 * (noise(p * frequency) + 1) - level_curve`, where
/// `noise` is `OpenSimplex` stretched to span [-1, 1].
#[derive(Clone)]
pub struct NoiseField {
    noise: ScaleBias<f64, OpenSimplex, 3>,
    seed: u32,
    level_curve: f64,
    frequency: f64,
}

impl NoiseField {
    pub fn new(seed: u32, level_curve: f64) -> Self {
        Self {
            noise: ScaleBias::new(OpenSimplex::new(seed))
                .set_scale(OPEN_SIMPLEX_AMPLITUDE.recip()),
            seed,
            level_curve,
            frequency: 1.0,
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn from_settings(settings: &GrowthSettings) -> Self {
        Self::new(settings.noise_seed, settings.level_curve).with_frequency(settings.frequency)
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn level_curve(&self) -> f64 {
        self.level_curve
    }

    /// Normalised noise value in [-1, 1], up to a small overshoot
    #[inline]
    pub fn sample(&self, p: DVec3) -> f64 {
        let q = p * self.frequency;
        self.noise.get([q.x, q.y, q.z])
    }
}

impl ScalarField for NoiseField {
    #[inline]
    fn evaluate(&self, p: DVec3) -> f64 {
        0.5 * (self.sample(p) + 1.0) - self.level_curve
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("seed", &self.seed)
            .field("level_curve", &self.level_curve)
            .field("frequency", &self.frequency)
            .finish()
    }
}

/// Gradient estimate using forward differences
///
/// First-order accurate; callers must tolerate O(ε) truncation error.
pub fn gradient<F>(field: &F, p: DVec3) -> DVec3
where
    F: ScalarField + ?Sized,
{
    let h = field.evaluate(p);
    let dx = field.evaluate(p + DVec3::new(GRADIENT_STEP, 0.0, 0.0)) - h;
    let dy = field.evaluate(p + DVec3::new(0.0, GRADIENT_STEP, 0.0)) - h;
    let dz = field.evaluate(p + DVec3::new(0.0, 0.0, GRADIENT_STEP)) - h;
    DVec3::new(dx, dy, dz) / GRADIENT_STEP
}

/// The square of another field, minimised by gradient descent
pub struct Squared<'a, F: ?Sized>(pub &'a F);

impl<F> ScalarField for Squared<'_, F>
where
    F: ScalarField + ?Sized,
{
    #[inline]
    fn evaluate(&self, p: DVec3) -> f64 {
        let v = self.0.evaluate(p);
        v * v
    }
}
