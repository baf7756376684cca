use glam::Vec3;

use crate::constraints::jacobi::CorrectionBuffer;
use crate::math::DEGENERATE_LENGTH;

/// XPBD distance constraint between two particles.
///
/// Used for both structural edges and bending pairs; the two sets differ
/// only in the compliance they are projected with.
///
/// Reference: "XPBD: Position-Based Simulation of Compliant Constrained Dynamics",
/// Macklin et al., 2016
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceConstraint {
    /// Particle index A.
    pub i: u32,
    /// Particle index B.
    pub j: u32,
    /// Rest length (distance between the two particles at load time).
    pub rest_length: f32,
}

impl DistanceConstraint {
    pub fn new(i: u32, j: u32, rest_length: f32) -> Self {
        Self { i, j, rest_length }
    }

    /// Constraint whose rest length is the current distance between `i` and `j`.
    pub fn from_positions(i: u32, j: u32, positions: &[Vec3]) -> Self {
        let rest_length = (positions[i as usize] - positions[j as usize]).length();
        Self::new(i, j, rest_length)
    }

    pub(crate) fn shifted(&self, offset: u32) -> Self {
        Self::new(self.i + offset, self.j + offset, self.rest_length)
    }
}

/// Position corrections for one constraint, or `None` when it must be skipped
/// (degenerate length or both endpoints immovable).
///
/// `lambda = -C / (w_i + w_j + alpha)`, `dp_i = n * lambda * w_i`,
/// `dp_j = -n * lambda * w_j`.
#[inline]
fn project(
    p_i: Vec3,
    p_j: Vec3,
    w_i: f32,
    w_j: f32,
    rest_length: f32,
    alpha_tilde: f32,
) -> Option<(Vec3, Vec3)> {
    let w_sum = w_i + w_j;
    if w_sum <= 0.0 {
        return None;
    }
    let diff = p_i - p_j;
    let len = diff.length();
    if len < DEGENERATE_LENGTH || !len.is_finite() {
        return None;
    }
    let n = diff / len;
    let c_val = len - rest_length;
    let lambda = -c_val / (w_sum + alpha_tilde);
    Some((n * lambda * w_i, -n * lambda * w_j))
}

/// Project all constraints sequentially, updating positions in place
/// (Gauss-Seidel).
///
/// `alpha_tilde = compliance / dt^2`. Returns the number of constraints
/// skipped as degenerate.
pub fn solve_distance_constraints(
    constraints: &[DistanceConstraint],
    positions: &mut [Vec3],
    inv_mass: &[f32],
    compliance: f32,
    dt: f32,
) -> usize {
    let alpha_tilde = compliance / (dt * dt);
    let mut skipped = 0;

    for c in constraints {
        let i = c.i as usize;
        let j = c.j as usize;
        match project(positions[i], positions[j], inv_mass[i], inv_mass[j], c.rest_length, alpha_tilde) {
            Some((dp_i, dp_j)) => {
                positions[i] += dp_i;
                positions[j] += dp_j;
            }
            None => skipped += 1,
        }
    }
    skipped
}

/// Accumulate every constraint's correction into `scratch` without touching
/// positions (Jacobi). With the `parallel` feature the constraints are
/// processed on the rayon pool.
///
/// Returns the number of constraints skipped as degenerate.
pub fn accumulate_distance_constraints(
    constraints: &[DistanceConstraint],
    positions: &[Vec3],
    inv_mass: &[f32],
    compliance: f32,
    dt: f32,
    scratch: &CorrectionBuffer,
) -> usize {
    let alpha_tilde = compliance / (dt * dt);
    let accumulate = |c: &DistanceConstraint| -> usize {
        let i = c.i as usize;
        let j = c.j as usize;
        match project(positions[i], positions[j], inv_mass[i], inv_mass[j], c.rest_length, alpha_tilde) {
            Some((dp_i, dp_j)) => {
                scratch.add(i, dp_i);
                scratch.add(j, dp_j);
                0
            }
            None => 1,
        }
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        constraints.par_iter().map(accumulate).sum()
    }
    #[cfg(not(feature = "parallel"))]
    {
        constraints.iter().map(accumulate).sum()
    }
}
