use float_cmp::approx_eq;
use glam::Vec3;

use cloth_core::adjacency::AdjacencyList;
use cloth_core::constraints::contact::{direct_correction, solve_collisions};
use cloth_core::grid::SpatialHashGrid;
use cloth_core::particle::{ParticleSet, Phase};

const THICKNESS: f32 = 0.1;

/// Particles at `positions` whose rest state is spread far apart, so every
/// close pair counts as a contact.
fn scattered_rest(positions: &[Vec3]) -> ParticleSet {
    let mut particles = ParticleSet::with_capacity(positions.len());
    for &p in positions {
        particles.push(p, 1.0, 0.03);
    }
    for (i, rest) in particles.rest_position.iter_mut().enumerate() {
        *rest = Vec3::new(i as f32 * 10.0, 0.0, 0.0);
    }
    particles
}

fn build_adjacency(particles: &ParticleSet) -> AdjacencyList {
    let mut grid = SpatialHashGrid::new(THICKNESS, 5, particles.count);
    let mut adjacency = AdjacencyList::new(particles.count, 10);
    grid.rebuild(&particles.position);
    grid.query_all(&particles.position, THICKNESS, &mut adjacency);
    adjacency
}

#[test]
fn test_direct_correction_reaches_thickness() {
    let p = Vec3::ZERO;
    let q = Vec3::new(0.0, 0.0, 0.05);
    let (dp, dq) = direct_correction(p, q, false, false, THICKNESS, 1.0).unwrap();

    let dist_sq = ((q + dq) - (p + dp)).length_squared();
    assert!(dist_sq >= THICKNESS * THICKNESS - 1e-6, "distance {}", dist_sq.sqrt());
    assert!(approx_eq!(f32, dp.length(), dq.length(), ulps = 2), "split must be even");
}

#[test]
fn test_direct_correction_static_takes_nothing() {
    let p = Vec3::ZERO;
    let q = Vec3::new(0.05, 0.0, 0.0);

    let (dp, dq) = direct_correction(p, q, true, false, THICKNESS, 1.0).unwrap();
    assert_eq!(dp, Vec3::ZERO);
    assert!(approx_eq!(f32, dq.x, 0.05, epsilon = 1e-6));

    let (dp, dq) = direct_correction(p, q, false, true, THICKNESS, 1.0).unwrap();
    assert_eq!(dq, Vec3::ZERO);
    assert!(approx_eq!(f32, dp.x, -0.05, epsilon = 1e-6));

    assert!(direct_correction(p, q, true, true, THICKNESS, 1.0).is_none());
}

#[test]
fn test_direct_correction_clamped_to_max_step() {
    let (dp, dq) =
        direct_correction(Vec3::ZERO, Vec3::new(0.01, 0.0, 0.0), false, false, THICKNESS, 0.02)
            .unwrap();
    assert!(approx_eq!(f32, (dq - dp).length(), 0.02, epsilon = 1e-6));
}

#[test]
fn test_direct_correction_ignores_separated_and_coincident() {
    assert!(direct_correction(Vec3::ZERO, Vec3::X, false, false, THICKNESS, 1.0).is_none());
    assert!(direct_correction(Vec3::ONE, Vec3::ONE, false, false, THICKNESS, 1.0).is_none());
}

#[test]
fn test_adjacency_contact_pushes_to_thickness() {
    let mut particles = scattered_rest(&[Vec3::ZERO, Vec3::new(0.0, 0.0, 0.05)]);
    let adjacency = build_adjacency(&particles);
    assert_eq!(adjacency.pair_count(), 1);

    let report = solve_collisions(&adjacency, &mut particles, THICKNESS, 0.0);

    assert_eq!(report.resolved, 1);
    let dist_sq = (particles.position[1] - particles.position[0]).length_squared();
    assert!(dist_sq >= THICKNESS * THICKNESS - 1e-6, "distance {}", dist_sq.sqrt());
}

#[test]
fn test_adjacency_contact_static_partner_holds() {
    let mut particles = scattered_rest(&[Vec3::ZERO, Vec3::new(0.0, 0.04, 0.0)]);
    particles.set_static(0);
    let adjacency = build_adjacency(&particles);

    solve_collisions(&adjacency, &mut particles, THICKNESS, 0.0);

    assert_eq!(particles.position[0], Vec3::ZERO);
    assert!(approx_eq!(f32, particles.position[1].y, THICKNESS, epsilon = 1e-6));
}

#[test]
fn test_rest_neighbors_keep_their_spacing() {
    // Mesh neighbors closer than the thickness at rest are not pushed apart.
    let mut particles = ParticleSet::with_capacity(2);
    particles.push(Vec3::ZERO, 1.0, 0.03);
    particles.push(Vec3::new(0.05, 0.0, 0.0), 1.0, 0.03);
    let adjacency = build_adjacency(&particles);

    let report = solve_collisions(&adjacency, &mut particles, THICKNESS, 0.1);

    assert_eq!(particles.position[1], Vec3::new(0.05, 0.0, 0.0));
    assert_eq!(report.candidates, 1);
}

#[test]
fn test_compressed_rest_neighbors_restore_rest_distance() {
    let mut particles = ParticleSet::with_capacity(2);
    particles.push(Vec3::ZERO, 1.0, 0.03);
    particles.push(Vec3::new(0.06, 0.0, 0.0), 1.0, 0.03);
    particles.position[1].x = 0.02;
    let adjacency = build_adjacency(&particles);

    solve_collisions(&adjacency, &mut particles, THICKNESS, 0.0);

    let dist = (particles.position[1] - particles.position[0]).length();
    assert!(approx_eq!(f32, dist, 0.06, epsilon = 1e-6), "distance {dist}");
}

#[test]
fn test_coincident_pair_is_skipped() {
    let mut particles = scattered_rest(&[Vec3::ONE, Vec3::ONE]);
    let adjacency = build_adjacency(&particles);

    let report = solve_collisions(&adjacency, &mut particles, THICKNESS, 0.1);

    assert_eq!(report.degenerate, 1);
    assert_eq!(report.resolved, 0);
    assert!(particles.position.iter().all(|p| p.is_finite()));
}

#[test]
fn test_friction_damps_relative_slide() {
    let mut particles = scattered_rest(&[Vec3::ZERO, Vec3::new(0.0, 0.08, 0.0)]);
    // Opposite tangential motion this substep.
    particles.old_position[0] = Vec3::new(-0.01, 0.0, 0.0);
    particles.old_position[1] = Vec3::new(0.01, 0.08, 0.0);
    let adjacency = build_adjacency(&particles);

    solve_collisions(&adjacency, &mut particles, THICKNESS, 0.5);

    let slide_0 = particles.position[0].x - particles.old_position[0].x;
    let slide_1 = particles.position[1].x - particles.old_position[1].x;
    assert!((slide_0 - slide_1).abs() < 0.02, "relative slide not reduced");
}

#[test]
fn test_radius_probe_respects_static_phase() {
    let mut positions = vec![Vec3::ZERO, Vec3::new(0.03, 0.0, 0.0)];
    let phase = vec![Phase::Static, Phase::Dynamic];
    let mut grid = SpatialHashGrid::new(THICKNESS, 5, positions.len());
    grid.rebuild(&positions);

    let applied = grid.query_and_collide_all(THICKNESS, 1.0, &mut positions, &phase);

    assert!(applied >= 1);
    assert_eq!(positions[0], Vec3::ZERO);
    assert!(positions[1].x >= THICKNESS - 1e-6);
}
