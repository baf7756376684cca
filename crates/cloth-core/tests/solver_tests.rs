use glam::Vec3;
use test_case::test_case;

use cloth_core::constraints::distance::DistanceConstraint;
use cloth_core::constraints::ConstraintSet;
use cloth_core::{CollisionMode, ParticleSet, SimConfig, SolveMode, Solver};

const DT: f32 = 1.0 / 60.0;

fn loose_particles(positions: &[Vec3]) -> ParticleSet {
    let mut particles = ParticleSet::with_capacity(positions.len());
    for &p in positions {
        particles.push(p, 1.0, 0.03);
    }
    particles
}

#[test]
fn test_empty_session_is_noop() {
    let mut solver =
        Solver::new(ParticleSet::default(), ConstraintSet::default(), SimConfig::default())
            .unwrap();
    let stats = solver.step(DT);
    assert_eq!(stats.particle_count, 0);
    assert_eq!(stats.contacts, 0);
    assert!(solver.positions().is_empty());
}

#[test]
fn test_zero_dt_is_noop() {
    let particles = loose_particles(&[Vec3::new(0.0, 1.0, 0.0)]);
    let mut solver = Solver::new(particles, ConstraintSet::default(), SimConfig::default()).unwrap();
    solver.step(0.0);
    assert_eq!(solver.positions()[0], Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_gravity_pulls_down() {
    let particles = loose_particles(&[Vec3::new(0.0, 2.0, 0.0)]);
    let mut solver = Solver::new(particles, ConstraintSet::default(), SimConfig::default()).unwrap();
    solver.step(DT);
    assert!(solver.positions()[0].y < 2.0);
    assert!(solver.particles().velocity[0].y < 0.0);
}

#[test]
fn test_ground_floor_holds() {
    let positions: Vec<Vec3> = (0..20)
        .map(|i| Vec3::new(i as f32 * 0.2, -0.5 + 0.05 * i as f32, 0.0))
        .collect();
    let particles = loose_particles(&positions);
    let config = SimConfig { self_collision: false, ..SimConfig::default() };
    let mut solver = Solver::new(particles, ConstraintSet::default(), config).unwrap();

    for _ in 0..30 {
        solver.step(DT);
        for (i, p) in solver.positions().iter().enumerate() {
            let floor = 0.5 * solver.particles().radius[i];
            assert!(p.y >= floor - 1e-6, "particle {i} below floor at y = {}", p.y);
        }
    }
}

#[test]
fn test_solve_ground_counts_contacts() {
    let particles = loose_particles(&[Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]);
    let mut solver = Solver::new(particles, ConstraintSet::default(), SimConfig::default()).unwrap();
    assert_eq!(solver.solve_ground(), 1);
    assert_eq!(solver.positions()[0].y, 0.015);
}

#[test]
fn test_static_particle_never_moves() {
    let mut particles = loose_particles(&[Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.5, 0.0)]);
    particles.set_static(0);
    let constraints = ConstraintSet::new(vec![DistanceConstraint::new(0, 1, 0.5)], Vec::new());
    let mut solver = Solver::new(particles, constraints, SimConfig::default()).unwrap();

    for _ in 0..60 {
        solver.step(DT);
    }

    assert_eq!(solver.positions()[0], Vec3::new(0.0, 1.0, 0.0));
    let len = (solver.positions()[1] - solver.positions()[0]).length();
    assert!((len - 0.5).abs() < 0.01, "pendulum length drifted to {len}");
}

#[test]
fn test_velocity_clamp_limits_substep_travel() {
    let mut particles = loose_particles(&[Vec3::new(0.0, 5.0, 0.0)]);
    particles.velocity[0] = Vec3::new(100.0, 0.0, 0.0);
    let config = SimConfig::default();
    let sdt = DT / config.substeps as f32;
    let max_travel = config.velocity_clamp * config.thickness;
    let mut solver = Solver::new(particles, ConstraintSet::default(), config).unwrap();

    solver.predict(sdt);

    let travel = (solver.positions()[0] - solver.particles().old_position[0]).length();
    assert!(travel <= max_travel * 1.0001, "moved {travel} in one substep");
}

#[test]
fn test_frame_dt_is_clamped() {
    let config = SimConfig::default();
    let max_frame_dt = config.max_frame_dt;
    let mut a = Solver::new(loose_particles(&[Vec3::Y * 3.0]), ConstraintSet::default(), config.clone())
        .unwrap();
    let mut b =
        Solver::new(loose_particles(&[Vec3::Y * 3.0]), ConstraintSet::default(), config).unwrap();

    a.step(1.0);
    b.step(max_frame_dt);

    assert_eq!(a.positions()[0], b.positions()[0]);
}

#[test_case(CollisionMode::Adjacency, SolveMode::GaussSeidel; "adjacency gauss-seidel")]
#[test_case(CollisionMode::Adjacency, SolveMode::Jacobi; "adjacency jacobi")]
#[test_case(CollisionMode::RadiusProbe, SolveMode::GaussSeidel; "probe gauss-seidel")]
fn test_no_nan_after_stepping(collision_mode: CollisionMode, solve_mode: SolveMode) {
    // A tangle of coincident and near-coincident particles on a chain.
    let positions: Vec<Vec3> = (0..50)
        .map(|i| Vec3::new((i % 5) as f32 * 0.001, 0.5, (i / 25) as f32 * 0.001))
        .collect();
    let structural = (1..50)
        .map(|i| DistanceConstraint::new(i - 1, i, 0.05))
        .collect();
    let config = SimConfig { collision_mode, solve_mode, ..SimConfig::default() };
    let mut solver = Solver::new(
        loose_particles(&positions),
        ConstraintSet::new(structural, Vec::new()),
        config,
    )
    .unwrap();

    for _ in 0..60 {
        solver.step(DT);
    }

    assert!(solver.positions().iter().all(|p| p.is_finite()));
    assert!(solver.particles().velocity.iter().all(|v| v.is_finite()));
}

#[test]
fn test_self_collision_separates_overlap() {
    let mut particles = loose_particles(&[Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.01)]);
    particles.rest_position[1] = Vec3::new(5.0, 1.0, 0.0);
    let config = SimConfig { gravity: Vec3::ZERO, friction: 0.0, ..SimConfig::default() };
    let thickness = config.thickness;
    let mut solver = Solver::new(particles, ConstraintSet::default(), config).unwrap();

    let stats = solver.step(DT);

    assert!(stats.contacts >= 1);
    let dist = (solver.positions()[1] - solver.positions()[0]).length();
    assert!(dist >= thickness - 1e-4, "still overlapping at {dist}");
}

#[test]
fn test_new_rejects_bad_input() {
    let particles = loose_particles(&[Vec3::ZERO, Vec3::X]);
    let dangling = ConstraintSet::new(vec![DistanceConstraint::new(0, 5, 1.0)], Vec::new());
    assert!(Solver::new(particles.clone(), dangling, SimConfig::default()).is_err());

    let mut short = particles.clone();
    short.radius.pop();
    assert!(Solver::new(short, ConstraintSet::default(), SimConfig::default()).is_err());

    let bad_config = SimConfig { substeps: 0, ..SimConfig::default() };
    assert!(Solver::new(particles, ConstraintSet::default(), bad_config).is_err());
}

#[test]
fn test_set_config_rebuilds_hash_geometry() {
    let particles = loose_particles(&[Vec3::ZERO, Vec3::X]);
    let mut solver = Solver::new(particles, ConstraintSet::default(), SimConfig::default()).unwrap();

    let config = SimConfig { cell_size: 0.4, ..SimConfig::default() };
    solver.set_config(config).unwrap();
    assert_eq!(solver.grid().cell_size(), 0.4);

    let invalid = SimConfig { cell_size: -1.0, ..SimConfig::default() };
    assert!(solver.set_config(invalid).is_err());
    assert_eq!(solver.config().cell_size, 0.4);
}

#[test]
fn test_extend_constraints_rejects_dangling_index() {
    let particles = loose_particles(&[Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.5, 0.0)]);
    let mut solver = Solver::new(particles, ConstraintSet::default(), SimConfig::default()).unwrap();

    let dangling = ConstraintSet::new(vec![DistanceConstraint::new(0, 9, 1.0)], Vec::new());
    assert!(solver.extend_constraints(&dangling).is_err());
    assert!(solver.constraints().is_empty());

    // The session keeps stepping on its validated constraint set.
    solver.step(DT);
    assert!(solver.positions().iter().all(|p| p.is_finite()));
}

#[test]
fn test_extend_constraints_takes_part_in_step() {
    let particles = loose_particles(&[Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.8, 0.0)]);
    let config = SimConfig { gravity: Vec3::ZERO, self_collision: false, ..SimConfig::default() };
    let mut solver = Solver::new(particles, ConstraintSet::default(), config).unwrap();

    let edge = ConstraintSet::new(vec![DistanceConstraint::new(0, 1, 0.5)], Vec::new());
    solver.extend_constraints(&edge).unwrap();
    assert_eq!(solver.constraints().len(), 1);

    let stats = solver.step(DT);
    assert_eq!(stats.constraint_count, 1);
    let len = (solver.positions()[1] - solver.positions()[0]).length();
    assert!((len - 0.5).abs() < 1e-3, "edge length {len}");
}

#[test]
fn test_pin_checks_range() {
    let particles = loose_particles(&[Vec3::new(0.0, 1.0, 0.0)]);
    let mut solver = Solver::new(particles, ConstraintSet::default(), SimConfig::default()).unwrap();

    assert!(solver.pin(3).is_err());
    solver.pin(0).unwrap();
    solver.step(DT);
    assert_eq!(solver.positions()[0], Vec3::new(0.0, 1.0, 0.0));
}
