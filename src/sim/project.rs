//! Projection of arbitrary points onto the zero level-set
//!
//! Two root finders with complementary failure modes:
//! - Newton-Raphson along the gradient: fast near a root, unreliable far away
//! - Gradient descent on f²: slow but globally convergent (to a root or a
//!   non-surface basin, which is reported as such)

use glam::DVec3;

use super::field::{ScalarField, Squared, gradient};
use crate::error::SimError;
use crate::settings::GrowthSettings;

/// Step sizes and stopping criteria shared by both root finders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub speed_limit: f64,
    pub tolerance: f64,
    pub descent_rate: f64,
    pub max_iterations: u32,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self::from(&GrowthSettings::default())
    }
}

impl From<&GrowthSettings> for ProjectionParams {
    fn from(settings: &GrowthSettings) -> Self {
        Self {
            speed_limit: settings.speed_limit,
            tolerance: settings.tolerance,
            descent_rate: settings.descent_rate,
            max_iterations: settings.max_projection_iterations,
        }
    }
}

/// Damped Newton-Raphson along the gradient direction
///
/// Each iteration moves by `f / |∇f|` clamped to `±speed_limit`, which keeps
/// the walk inside the region where the field is roughly linear.
pub fn newton_raphson<F>(
    field: &F,
    start: DVec3,
    params: &ProjectionParams,
) -> Result<DVec3, SimError>
where
    F: ScalarField + ?Sized,
{
    let mut x = start;
    let mut value = field.evaluate(x);
    let mut iterations = 0;

    while iterations < params.max_iterations {
        iterations += 1;
        let g = gradient(field, x);
        let slope = g.length();
        let direction = g.try_normalize().ok_or(SimError::DegenerateVector)?;

        let speed = (value / slope).clamp(-params.speed_limit, params.speed_limit);
        let next = x - direction * speed;
        // NaN residual: stop where we are
        if !next.is_finite() {
            break;
        }

        let converged = value.abs() < params.tolerance && speed.abs() < params.tolerance;
        x = next;
        if converged {
            return Ok(x);
        }
        value = field.evaluate(x);
    }

    Err(SimError::NonConvergence {
        point: x,
        iterations,
        residual: value,
    })
}

/// Gradient descent on f², polished by [`newton_raphson`] when it lands on the surface
///
/// Returns [`SimError::DegenerateSeed`] when the descent settles in a basin
/// whose minimum is not a root.
pub fn gradient_descent<F>(
    field: &F,
    start: DVec3,
    params: &ProjectionParams,
) -> Result<DVec3, SimError>
where
    F: ScalarField + ?Sized,
{
    let squared = Squared(field);
    let mut x = start;
    let mut residual = squared.evaluate(x);

    for _ in 0..params.max_iterations {
        // Already on the zero set: f² cannot decrease further
        if residual < params.tolerance * params.tolerance {
            break;
        }
        let g = gradient(&squared, x);
        let magnitude = g.length();
        if magnitude < params.tolerance {
            break;
        }
        let speed = (params.descent_rate * magnitude).min(params.speed_limit);
        x -= g / magnitude * speed;
        residual = squared.evaluate(x);
    }

    if residual < params.tolerance {
        newton_raphson(field, x, params)
    } else {
        log::debug!("descent stalled at {x} with f² = {residual:e}");
        Err(SimError::DegenerateSeed { point: x, residual })
    }
}
