use std::time::Instant;

use glam::Vec3;

use crate::adjacency::AdjacencyList;
use crate::config::{CollisionMode, SimConfig, SolveMode};
use crate::constraints::contact::solve_collisions;
use crate::constraints::distance::{
    accumulate_distance_constraints, solve_distance_constraints, DistanceConstraint,
};
use crate::constraints::jacobi::CorrectionBuffer;
use crate::constraints::ConstraintSet;
use crate::grid::SpatialHashGrid;
use crate::math::clamp_length;
use crate::particle::ParticleSet;
use crate::quality::StepStats;

/// A simulation session.
///
/// Owns the particle arena, the constraint sets, the spatial hash and every
/// per-step buffer. Both are validated on the way in and only read through
/// accessors afterwards, so `step` never sees a dangling index. Rendering
/// reads `positions()` between steps and never writes.
pub struct Solver {
    particles: ParticleSet,
    constraints: ConstraintSet,
    config: SimConfig,
    grid: SpatialHashGrid,
    adjacency: AdjacencyList,
    scratch: CorrectionBuffer,
}

impl Solver {
    /// Validate the inputs and allocate the hash and scratch buffers for
    /// `particles.count` particles.
    pub fn new(
        particles: ParticleSet,
        constraints: ConstraintSet,
        config: SimConfig,
    ) -> Result<Self, String> {
        config.validate()?;
        check_particles(&particles)?;
        constraints.validate(particles.count)?;

        let count = particles.count;
        ftlog::info!(
            "solver session: {} particles ({} static), {} structural + {} bending constraints",
            count,
            particles.static_count(),
            constraints.structural.len(),
            constraints.bending.len()
        );

        Ok(Self {
            grid: SpatialHashGrid::new(config.cell_size, config.table_multiplier, count),
            adjacency: AdjacencyList::new(count, config.adjacency_per_particle),
            scratch: CorrectionBuffer::new(count),
            particles,
            constraints,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the configuration. The hash is rebuilt when its geometry changes.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), String> {
        config.validate()?;
        if config.cell_size != self.config.cell_size
            || config.table_multiplier != self.config.table_multiplier
        {
            self.grid =
                SpatialHashGrid::new(config.cell_size, config.table_multiplier, self.particles.count);
        }
        self.config = config;
        Ok(())
    }

    /// Current particle positions, indexed like the input particles.
    pub fn positions(&self) -> &[Vec3] {
        &self.particles.position
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Append constraints after checking them against this session's
    /// particles. Nothing is appended when any constraint is invalid.
    pub fn extend_constraints(&mut self, extra: &ConstraintSet) -> Result<(), String> {
        extra.validate(self.particles.count)?;
        self.constraints.extend_shifted(extra, 0);
        ftlog::debug!("session constraints extended by {}", extra.len());
        Ok(())
    }

    /// Pin particle `i` in place for the rest of the session.
    pub fn pin(&mut self, i: usize) -> Result<(), String> {
        if i >= self.particles.count {
            return Err(format!(
                "cannot pin particle {i}: session has {} particles",
                self.particles.count
            ));
        }
        self.particles.set_static(i);
        Ok(())
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    /// Adjacency list built by the last collision pass.
    pub fn adjacency(&self) -> &AdjacencyList {
        &self.adjacency
    }

    /// Advance the simulation by one frame.
    ///
    /// `dt` is clamped to `max_frame_dt` and split into `substeps` equal
    /// substeps. A session without particles does nothing.
    pub fn step(&mut self, dt: f32) -> StepStats {
        let start = Instant::now();
        let mut stats = StepStats {
            substeps: self.config.substeps,
            iterations: self.config.solver_iterations,
            particle_count: self.particles.count as u32,
            constraint_count: self.constraints.len() as u32,
            ..StepStats::default()
        };

        let frame_dt = dt.min(self.config.max_frame_dt);
        if self.particles.is_empty() || !(frame_dt > 1.0e-9) {
            return stats;
        }

        let substeps = self.config.substeps.max(1);
        let sdt = frame_dt / substeps as f32;

        for _ in 0..substeps {
            self.predict(sdt);
            stats.ground_contacts += self.solve_ground() as u32;
            for _ in 0..self.config.solver_iterations {
                stats.skipped += self.project_constraints(sdt) as u32;
            }
            if self.config.self_collision {
                self.solve_self_collisions(&mut stats);
            }
            self.update_velocities(sdt);
        }

        stats.total_ms = start.elapsed().as_secs_f32() * 1000.0;
        stats
    }

    /// Save old positions, apply gravity, clamp speed, integrate position.
    ///
    /// The speed limit `velocity_clamp * thickness / sdt` keeps a particle
    /// from crossing more than a fraction of the collision thickness per
    /// substep.
    pub fn predict(&mut self, sdt: f32) {
        let gravity = self.config.gravity;
        let max_speed = self.config.velocity_clamp * self.config.thickness / sdt;
        let p = &mut self.particles;

        for i in 0..p.count {
            if !p.is_movable(i) {
                continue;
            }
            p.old_position[i] = p.position[i];
            let mut vel = p.velocity[i] + gravity * sdt;
            if max_speed > 0.0 {
                vel = clamp_length(vel, max_speed);
            }
            p.velocity[i] = vel;
            p.position[i] += vel * sdt;
        }
    }

    /// Hard floor at `y = 0.5 * radius`.
    ///
    /// A particle below the floor loses `ground_damping` of its substep
    /// displacement and is placed exactly on the floor. Returns the number of
    /// particles that touched the ground.
    pub fn solve_ground(&mut self) -> usize {
        let damping = self.config.ground_damping;
        let p = &mut self.particles;
        let mut touched = 0;

        for i in 0..p.count {
            if !p.is_movable(i) {
                continue;
            }
            let floor = 0.5 * p.radius[i];
            if p.position[i].y < floor {
                let delta = p.position[i] - p.old_position[i];
                p.position[i] -= delta * damping;
                p.position[i].y = floor;
                touched += 1;
            }
        }
        touched
    }

    /// One projection pass over structural then bending constraints.
    ///
    /// Returns the number of constraints skipped as degenerate.
    pub fn project_constraints(&mut self, sdt: f32) -> usize {
        let stretch = self.config.stretch_compliance;
        let bend = self.config.bend_compliance;
        let mut skipped = 0;
        // Split borrows: the constraint lists are read while particles are written.
        let Self { particles, constraints, scratch, config, .. } = self;

        let passes: [(&[DistanceConstraint], f32); 2] =
            [(&constraints.structural, stretch), (&constraints.bending, bend)];
        for (set, compliance) in passes {
            if set.is_empty() {
                continue;
            }
            match config.solve_mode {
                SolveMode::GaussSeidel => {
                    skipped += solve_distance_constraints(
                        set,
                        &mut particles.position,
                        &particles.inv_mass,
                        compliance,
                        sdt,
                    );
                }
                SolveMode::Jacobi => {
                    scratch.reset(particles.count);
                    skipped += accumulate_distance_constraints(
                        set,
                        &particles.position,
                        &particles.inv_mass,
                        compliance,
                        sdt,
                        scratch,
                    );
                    scratch.apply(
                        &mut particles.position,
                        &particles.inv_mass,
                        config.jacobi_regularization,
                    );
                }
            }
        }
        skipped
    }

    /// Rebuild the hash from current positions and resolve particle contacts
    /// with the configured collision mode.
    pub fn solve_self_collisions(&mut self, stats: &mut StepStats) {
        let report = self.grid.rebuild(&self.particles.position);
        stats.hash_overflows += report.overflowed as u32;
        let thickness = self.config.thickness;

        match self.config.collision_mode {
            CollisionMode::Adjacency => {
                let pairs =
                    self.grid
                        .query_all(&self.particles.position, thickness, &mut self.adjacency);
                stats.adjacency_pairs = pairs as u32;
                stats.adjacency_overflows += self.adjacency.overflowed() as u32;

                let report = solve_collisions(
                    &self.adjacency,
                    &mut self.particles,
                    thickness,
                    self.config.friction,
                );
                stats.contacts += report.resolved as u32;
                stats.skipped += report.degenerate as u32;
            }
            CollisionMode::RadiusProbe => {
                let applied = self.grid.query_and_collide_all(
                    thickness,
                    self.config.max_collision_step,
                    &mut self.particles.position,
                    &self.particles.phase,
                );
                stats.contacts += applied as u32;
            }
        }
    }

    /// `v = (x - x_old) / sdt` for every movable particle.
    pub fn update_velocities(&mut self, sdt: f32) {
        let p = &mut self.particles;
        for i in 0..p.count {
            if !p.is_movable(i) {
                continue;
            }
            p.velocity[i] = (p.position[i] - p.old_position[i]) / sdt;
        }
    }
}

/// Every per-particle array must have one entry per particle, and positions
/// must start finite.
fn check_particles(particles: &ParticleSet) -> Result<(), String> {
    let n = particles.count;
    let lengths = [
        ("position", particles.position.len()),
        ("old_position", particles.old_position.len()),
        ("velocity", particles.velocity.len()),
        ("inv_mass", particles.inv_mass.len()),
        ("radius", particles.radius.len()),
        ("rest_position", particles.rest_position.len()),
        ("phase", particles.phase.len()),
    ];
    for (name, len) in lengths {
        if len != n {
            return Err(format!("particle array `{name}` has {len} entries, expected {n}"));
        }
    }
    if let Some(i) = particles.position.iter().position(|p| !p.is_finite()) {
        return Err(format!("particle {i} has a non-finite position"));
    }
    Ok(())
}
