//! Deterministic simulation module
//!
//! All growth logic lives here. This module must be pure and deterministic:
//! - Randomness only through the injected RNG
//! - Stable iteration order (by particle index)
//! - No rendering or platform dependencies

pub mod field;
pub mod octree;
pub mod project;
pub mod repulsion;
pub mod state;
pub mod tick;

pub use field::{NoiseField, ScalarField, Squared, gradient};
pub use octree::Octree;
pub use project::{ProjectionParams, gradient_descent, newton_raphson};
pub use repulsion::{Repulsion, RepulsionParams};
pub use state::{GrowthPhase, GrowthState, StepStats};
pub use tick::{insert_near, step};
