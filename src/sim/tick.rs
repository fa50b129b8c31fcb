//! One growth step
//!
//! Rebuild the octree, repel, re-project, measure density and, when the
//! population is too sparse, insert one particle next to the most isolated one.

use glam::DVec3;
use rand::Rng;

use super::field::{ScalarField, gradient};
use super::octree::Octree;
use super::project::{ProjectionParams, newton_raphson};
use super::repulsion::{self, RepulsionParams};
use super::state::{GrowthPhase, GrowthState, StepStats};
use crate::random_tangent_direction;
use crate::settings::GrowthSettings;

/// Advance the simulation by one step
pub fn step<F, R>(
    state: &mut GrowthState,
    field: &F,
    settings: &GrowthSettings,
    rng: &mut R,
) -> StepStats
where
    F: ScalarField + ?Sized,
    R: Rng,
{
    state.step_count += 1;

    if state.force_strength < settings.quiescence_threshold() {
        if state.phase != GrowthPhase::Quiescent {
            log::info!(
                "Reached quiescence after {} steps with {} particles",
                state.step_count - 1,
                state.particles.len()
            );
            state.phase = GrowthPhase::Quiescent;
        }
        return StepStats {
            step: state.step_count,
            particle_count: state.particles.len(),
            force_strength: state.force_strength,
            inserted: false,
            reverted: 0,
            quiescent: true,
            ..state.last_stats.clone()
        };
    }
    state.phase = GrowthPhase::Growing;

    let tree = Octree::build(&state.particles);
    let params = RepulsionParams {
        force_strength: state.force_strength,
        max_radius: settings.max_repulsion_radius(),
        speed_limit: settings.speed_limit,
    };
    let repulsion = repulsion::compute(field, &state.particles, &tree, &params);

    let projection = ProjectionParams::from(settings);
    let reverted = repulsion::apply(field, &mut state.particles, &repulsion.forces, &projection);

    let inserted = repulsion.median_separation > settings.target_edge_length
        && insert_near(state, field, settings, rng, repulsion.most_isolated);

    state.force_strength *= settings.force_decay();

    let stats = StepStats {
        step: state.step_count,
        average_neighbors: repulsion.average_neighbors,
        median_separation: repulsion.median_separation,
        most_isolated_distance: repulsion.most_isolated_distance,
        particle_count: state.particles.len(),
        force_strength: state.force_strength,
        inserted,
        reverted,
        quiescent: false,
    };
    log::trace!("{stats}");
    state.last_stats = stats.clone();
    stats
}

/// Add a particle one `speed_limit` away from `source` along a random tangent
///
/// Returns false (and leaves the state untouched) when no direction could be
/// drawn or the new point fails to project back onto the surface.
pub fn insert_near<F, R>(
    state: &mut GrowthState,
    field: &F,
    settings: &GrowthSettings,
    rng: &mut R,
    source: usize,
) -> bool
where
    F: ScalarField + ?Sized,
    R: Rng,
{
    let Some(&origin) = state.particles.get(source) else {
        return false;
    };
    let Some(candidate) = displaced_candidate(field, origin, settings.speed_limit, rng) else {
        log::warn!("no tangent direction at particle {source}; skipping insertion");
        return false;
    };

    match newton_raphson(field, candidate, &ProjectionParams::from(settings)) {
        Ok(p) => {
            state.particles.push(p);
            state.last_inserted = Some(state.particles.len() - 1);
            state.force_strength = settings.force_strength_reset;
            log::debug!("inserted particle {} next to {source}", state.particles.len() - 1);
            true
        }
        Err(err) => {
            log::warn!("insertion next to particle {source} skipped: {err}");
            false
        }
    }
}

/// `origin` moved `distance` along a uniformly random direction tangent to the field
fn displaced_candidate<F, R>(field: &F, origin: DVec3, distance: f64, rng: &mut R) -> Option<DVec3>
where
    F: ScalarField + ?Sized,
    R: Rng,
{
    let normal = gradient(field, origin);
    let dir = random_tangent_direction(rng, normal)?;
    Some(origin + dir * distance)
}
