//! Pairwise repulsion on a curved surface
//!
//! Forces are inverse-square pushes between neighbours, flattened onto each
//! particle's tangent plane and then scaled down together so the fastest
//! particle moves exactly `speed_limit`. The neighbour scan doubles as the
//! density survey the growth step uses to decide on insertions.

use glam::DVec3;

use super::field::{ScalarField, gradient};
use super::octree::Octree;
use super::project::{ProjectionParams, newton_raphson};
use crate::error::SimError;
use crate::project_to_tangent;

/// Inputs of one force evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepulsionParams {
    pub force_strength: f64,
    /// Neighbour search radius
    pub max_radius: f64,
    pub speed_limit: f64,
}

/// Forces and density statistics from one neighbour scan
#[derive(Debug, Clone, Default)]
pub struct Repulsion {
    /// Tangent-projected, speed-limited displacement per particle
    pub forces: Vec<DVec3>,
    /// Squared distance to the nearest neighbour (`max_radius²` when alone)
    pub min_separation_sq: Vec<f64>,
    /// Particle whose nearest neighbour is farthest away
    pub most_isolated: usize,
    pub most_isolated_distance: f64,
    /// Median of the per-particle nearest-neighbour distances
    pub median_separation: f64,
    pub average_neighbors: f64,
    /// Largest tangent force before the global drag was applied
    pub max_magnitude: f64,
}

/// Inverse-square push on `p` from `other`; `None` when the two coincide
#[inline]
pub fn pair_force(p: DVec3, other: DVec3, strength: f64) -> Option<DVec3> {
    let delta = p - other;
    let dist_sq = delta.length_squared();
    let dir = delta.try_normalize()?;
    Some(dir * (strength / dist_sq))
}

/// Evaluate repulsion for every particle against the octree built from `particles`
pub fn compute<F>(
    field: &F,
    particles: &[DVec3],
    tree: &Octree,
    params: &RepulsionParams,
) -> Repulsion
where
    F: ScalarField + ?Sized,
{
    let n = particles.len();
    if n == 0 {
        return Repulsion::default();
    }

    let lonely_sq = params.max_radius * params.max_radius;
    let mut forces = Vec::with_capacity(n);
    let mut min_separation_sq = Vec::with_capacity(n);
    let mut neighbor_total = 0usize;

    for &p in particles {
        let mut force = DVec3::ZERO;
        let mut nearest_sq = lonely_sq;
        tree.for_each_within(p, params.max_radius, |_, q, d2| {
            neighbor_total += 1;
            nearest_sq = nearest_sq.min(d2);
            // Coincident pairs contribute nothing
            if let Some(f) = pair_force(p, q, params.force_strength) {
                force += f;
            }
        });
        forces.push(project_to_tangent(force, gradient(field, p)));
        min_separation_sq.push(nearest_sq);
    }

    let max_magnitude = forces.iter().map(|f| f.length()).fold(0.0, f64::max);
    if max_magnitude > params.speed_limit {
        let drag = params.speed_limit / max_magnitude;
        for f in &mut forces {
            *f *= drag;
        }
    }

    // First particle wins ties
    let mut most_isolated = 0;
    let mut isolated_sq = f64::NEG_INFINITY;
    for (i, &d2) in min_separation_sq.iter().enumerate() {
        if d2 > isolated_sq {
            most_isolated = i;
            isolated_sq = d2;
        }
    }

    let mut sorted = min_separation_sq.clone();
    let mid = n / 2;
    sorted.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let median_separation = sorted[mid].sqrt();

    Repulsion {
        forces,
        min_separation_sq,
        most_isolated,
        most_isolated_distance: isolated_sq.sqrt(),
        median_separation,
        average_neighbors: neighbor_total as f64 / n as f64,
        max_magnitude,
    }
}

/// Move one particle by `force` and pull it back onto the surface
pub fn settle<F>(
    field: &F,
    from: DVec3,
    force: DVec3,
    params: &ProjectionParams,
) -> Result<DVec3, SimError>
where
    F: ScalarField + ?Sized,
{
    newton_raphson(field, from + force, params)
}

/// Apply forces in place, reverting any particle whose re-projection fails
///
/// Returns how many particles were held at their previous position.
pub fn apply<F>(
    field: &F,
    particles: &mut [DVec3],
    forces: &[DVec3],
    params: &ProjectionParams,
) -> usize
where
    F: ScalarField + ?Sized,
{
    let mut reverted = 0;
    for (i, (p, &force)) in particles.iter_mut().zip(forces).enumerate() {
        if force == DVec3::ZERO {
            continue;
        }
        match settle(field, *p, force, params) {
            Ok(next) => *p = next,
            Err(err) => {
                log::warn!("particle {i} held in place: {err}");
                reverted += 1;
            }
        }
    }
    reverted
}
