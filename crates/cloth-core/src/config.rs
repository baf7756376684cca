use glam::Vec3;

/// How candidate pairs found by the spatial hash are resolved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollisionMode {
    /// Build a per-particle adjacency list, then resolve pairs mass-weighted
    /// with rest-distance awareness and friction.
    Adjacency,
    /// Probe the cell neighborhood of every particle and push overlapping
    /// pairs apart immediately (unweighted, clamped).
    RadiusProbe,
}

/// Update discipline for the constraint projection passes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolveMode {
    /// Sequential in-place projection. Deterministic.
    GaussSeidel,
    /// Accumulate corrections into an atomic scratch buffer, apply once per
    /// particle. Runs on rayon with the `parallel` feature.
    Jacobi,
}

/// Largest self-collision thickness, in cells, a collision query may span.
pub const MAX_THICKNESS_CELLS: f32 = 4.0;

#[derive(Clone, Debug)]
pub struct SimConfig {
    pub substeps: u32,
    pub solver_iterations: u32,
    pub gravity: Vec3,
    /// Structural edge compliance (0 = inextensible)
    pub stretch_compliance: f32,
    /// Bending pair compliance, softer than stretch
    pub bend_compliance: f32,
    /// Self-collision interaction distance
    pub thickness: f32,
    /// Fraction of the substep displacement removed on ground contact
    pub ground_damping: f32,
    /// Pair velocity smoothing during self-collision
    pub friction: f32,
    /// Max speed = velocity_clamp * thickness / sdt
    pub velocity_clamp: f32,
    /// Largest single correction applied by the radius probe
    pub max_collision_step: f32,
    /// Frame dt is clamped to this before splitting into substeps
    pub max_frame_dt: f32,
    pub self_collision: bool,
    pub collision_mode: CollisionMode,
    pub solve_mode: SolveMode,
    /// Added to the correction count when a Jacobi pass is applied
    pub jacobi_regularization: f32,
    pub cell_size: f32,
    /// Hash table size = particle capacity * multiplier + 1
    pub table_multiplier: usize,
    /// Initial adjacency array slots per particle
    pub adjacency_per_particle: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            substeps: 10,
            solver_iterations: 1,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            stretch_compliance: 0.0,
            bend_compliance: 1.0,
            thickness: 0.05,
            ground_damping: 1.0,
            friction: 0.1,
            velocity_clamp: 0.2,
            max_collision_step: 0.1,
            max_frame_dt: 0.02,
            self_collision: true,
            collision_mode: CollisionMode::Adjacency,
            solve_mode: SolveMode::GaussSeidel,
            jacobi_regularization: 0.5,
            cell_size: 0.15,
            table_multiplier: 5,
            adjacency_per_particle: 10,
        }
    }
}

impl SimConfig {
    /// Reject knob combinations the solver cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.substeps == 0 {
            return Err("substeps must be at least 1".to_string());
        }
        if !(self.cell_size > 0.0 && self.cell_size.is_finite()) {
            return Err(format!("cell_size must be positive, got {}", self.cell_size));
        }
        if self.table_multiplier == 0 {
            return Err("table_multiplier must be at least 1".to_string());
        }
        if self.thickness < 0.0 || !self.thickness.is_finite() {
            return Err(format!("thickness must be non-negative, got {}", self.thickness));
        }
        if self.thickness > MAX_THICKNESS_CELLS * self.cell_size {
            return Err(format!(
                "thickness {} spans more than {MAX_THICKNESS_CELLS} cells of size {}",
                self.thickness, self.cell_size
            ));
        }
        if self.stretch_compliance < 0.0 || self.bend_compliance < 0.0 {
            return Err("compliance must be non-negative".to_string());
        }
        if !(self.max_frame_dt > 0.0) {
            return Err(format!("max_frame_dt must be positive, got {}", self.max_frame_dt));
        }
        if self.jacobi_regularization < 0.0 {
            return Err("jacobi_regularization must be non-negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_substeps() {
        let config = SimConfig { substeps: 0, ..SimConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_degenerate_cell_size() {
        for cell_size in [0.0, -1.0, f32::NAN] {
            let config = SimConfig { cell_size, ..SimConfig::default() };
            assert!(config.validate().is_err(), "cell_size {cell_size} accepted");
        }
    }

    #[test]
    fn test_rejects_thickness_far_beyond_cell_size() {
        let config = SimConfig { thickness: 1.0, cell_size: 0.15, ..SimConfig::default() };
        assert!(config.validate().is_err());

        let at_limit = SimConfig {
            thickness: MAX_THICKNESS_CELLS * 0.15,
            cell_size: 0.15,
            ..SimConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }
}
