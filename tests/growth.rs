use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use isogrow::consts::{DEFAULT_LEVEL_CURVE, DEFAULT_NOISE_SEED};
use isogrow::sim::{NoiseField, Octree, ScalarField};
use isogrow::{GrowthSettings, Simulation};

/// Default settings: noise seed 123 with the 0.2 level curve
pub fn noise_settings() -> GrowthSettings {
    let settings = GrowthSettings::default();
    assert_eq!(settings.noise_seed, DEFAULT_NOISE_SEED);
    assert_eq!(settings.level_curve, DEFAULT_LEVEL_CURVE);
    settings
}

/// Simulation seeded from the origin of the default noise field
pub fn seeded_noise_simulation() -> Simulation<NoiseField> {
    Simulation::from_settings(noise_settings()).expect("default noise field has a surface")
}

/// Uniform points in the [-1, 1] cube
pub fn random_cloud(n: usize, seed: u64) -> Vec<DVec3> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            DVec3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            )
        })
        .collect()
}

// ==================================================================================
// Noise surface
// ==================================================================================

#[test]
fn noise_surface_grows_and_stays_on_surface() {
    let mut sim = seeded_noise_simulation();
    let tolerance = sim.settings().tolerance;
    let target = sim.settings().target_edge_length;
    assert!(sim.field().evaluate(sim.particles()[0]).abs() < tolerance);

    let mut last = sim.particles().len();
    let mut medians = Vec::with_capacity(1000);
    for _ in 0..1000 {
        let stats = sim.step();
        assert!(stats.particle_count >= last);
        last = stats.particle_count;
        medians.push(stats.median_separation);
    }
    assert!(sim.particles().len() > 100, "grew only {} particles", sim.particles().len());
    for p in sim.particles() {
        assert!(sim.field().evaluate(*p).abs() < tolerance, "{p} drifted off the surface");
    }
    for m in &medians[900..] {
        assert!((m - target).abs() <= 0.2 * target, "median {m} vs target {target}");
    }
}

#[test]
fn noise_runs_are_reproducible() {
    let mut a = seeded_noise_simulation();
    let settings = a.settings().clone();
    let mut b = Simulation::from_settings(settings).expect("same settings seed again");
    for _ in 0..200 {
        assert_eq!(a.step(), b.step());
    }
    assert_eq!(a.particles(), b.particles());
}

#[test]
fn level_curve_moves_the_surface() {
    let low = NoiseField::new(123, 0.2);
    let high = NoiseField::new(123, 0.6);
    let p = DVec3::new(0.3, -0.2, 0.7);
    assert!((low.evaluate(p) - high.evaluate(p) - 0.4).abs() < 1e-12);
}

// ==================================================================================
// Octree
// ==================================================================================

#[test]
fn octree_matches_brute_force_on_large_cloud() {
    let points = random_cloud(1200, 11);
    let tree = Octree::build(&points);
    for (k, &center) in points.iter().enumerate().step_by(37) {
        for radius in [0.05, 0.2, 0.6] {
            let mut got = tree.query_radius(center, radius);
            got.sort_unstable();
            let expected: Vec<usize> = points
                .iter()
                .enumerate()
                .filter(|(_, q)| {
                    let d = center.distance(**q);
                    d > 0.0 && d < radius
                })
                .map(|(i, _)| i)
                .collect();
            assert_eq!(got, expected, "point {k} radius {radius}");
        }
    }
}

#[test]
fn octree_over_grown_particles_matches_brute_force() {
    let sphere = |p: DVec3| p.length() - 0.5;
    let mut sim = Simulation::seed(sphere, GrowthSettings::default(), DVec3::ZERO).unwrap();
    while sim.particles().len() < 500 && sim.state().step_count < 5_000 {
        sim.step();
    }
    let points = sim.particles().to_vec();
    assert!(points.len() >= 500, "only grew {} particles", points.len());

    let radius = sim.settings().max_repulsion_radius();
    let tree = Octree::build(&points);
    for &center in points.iter().step_by(13) {
        let mut got = tree.query_radius(center, radius);
        got.sort_unstable();
        let expected: Vec<usize> = (0..points.len())
            .filter(|&i| {
                let d = center.distance(points[i]);
                d > 0.0 && d < radius
            })
            .collect();
        assert_eq!(got, expected);
    }
}
