//! Isogrow - particles that tile the zero level-set of a noise field
//!
//! Core modules:
//! - `sim`: Deterministic simulation (field, projection, octree, repulsion, growth)
//! - `simulation`: Owned simulation handle exposed to drivers and renderers
//! - `settings`: Data-driven tunables (serde, presets, validation)
//! - `error`: Error taxonomy shared by every stage

pub mod error;
pub mod settings;
pub mod sim;
pub mod simulation;

pub use error::SimError;
pub use settings::{DetailPreset, GrowthSettings, SettingsError};
pub use simulation::Simulation;

use glam::DVec3;
use rand::Rng;

/// Simulation constants
pub mod consts {
    /// Finite difference step for gradient estimation
    pub const GRADIENT_STEP: f64 = 1.0 / 1_000_000.0;
    /// Values below this are treated as numerically zero
    pub const TOLERANCE: f64 = 1e-6;
    /// Maximum displacement per projection iteration / per step
    pub const SPEED_LIMIT: f64 = 0.01;
    /// Gradient descent multiplier on |∇(f²)|
    pub const DESCENT_RATE: f64 = 0.05;
    /// Iteration cap for both root finders
    pub const MAX_PROJECTION_ITERATIONS: u32 = 10_000;

    /// Desired spacing between neighbouring particles
    pub const TARGET_EDGE_LENGTH: f64 = 0.05;
    /// Neighbour search radius, as a multiple of the target spacing
    pub const REPULSION_RADIUS_FACTOR: f64 = 2.5;
    /// Force strength after every insertion
    pub const FORCE_STRENGTH_RESET: f64 = 0.001;
    /// Steps for the force strength to halve
    pub const FORCE_HALF_LIFE_STEPS: f64 = 50.0;

    /// Noise seed
    pub const DEFAULT_NOISE_SEED: u32 = 123;
    /// Seed for tangent-direction draws
    pub const DEFAULT_RNG_SEED: u64 = 0x5EED;
    /// Iso value on the remapped [0, 1] noise
    pub const DEFAULT_LEVEL_CURVE: f64 = 0.2;

    /// Soft frame budget for the driver loop (milliseconds)
    pub const TARGET_FRAME_MS: u64 = 30;

    /// Rejection sampling attempts before giving up on a unit vector
    pub const MAX_UNIT_VECTOR_ATTEMPTS: u32 = 64;
}

/// Remove the component of `v` along `normal`
///
/// `normal` does not need to be unit length; a zero normal leaves `v` as is.
#[inline]
pub fn project_to_tangent(v: DVec3, normal: DVec3) -> DVec3 {
    match normal.try_normalize() {
        Some(n) => v - n * v.dot(n),
        None => v,
    }
}

/// Uniformly distributed unit vector via rejection sampling in the unit ball
///
/// Bounded by [`consts::MAX_UNIT_VECTOR_ATTEMPTS`]; returns `None` only if every
/// draw landed outside the ball or at the origin.
pub fn random_unit_vector<R: Rng>(rng: &mut R) -> Option<DVec3> {
    for _ in 0..consts::MAX_UNIT_VECTOR_ATTEMPTS {
        let v = DVec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let len_sq = v.length_squared();
        if len_sq > 1.0 || len_sq < f64::EPSILON {
            continue;
        }
        return Some(v / len_sq.sqrt());
    }
    None
}

/// Uniformly distributed unit vector in the plane orthogonal to `normal`
pub fn random_tangent_direction<R: Rng>(rng: &mut R, normal: DVec3) -> Option<DVec3> {
    for _ in 0..consts::MAX_UNIT_VECTOR_ATTEMPTS {
        let v = random_unit_vector(rng)?;
        if let Some(dir) = project_to_tangent(v, normal).try_normalize() {
            return Some(dir);
        }
    }
    None
}
