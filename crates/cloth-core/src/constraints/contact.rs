use glam::Vec3;

use crate::adjacency::AdjacencyList;
use crate::math::separation;
use crate::particle::ParticleSet;

/// Direct (unweighted) push-apart for two particles closer than `radius`.
///
/// The overlap is clamped to `max_step` so deep interpenetration cannot
/// explode in one pass. A static particle is never moved: its partner takes
/// the whole correction. Returns the position deltas for (p, q).
pub fn direct_correction(
    p: Vec3,
    q: Vec3,
    p_static: bool,
    q_static: bool,
    radius: f32,
    max_step: f32,
) -> Option<(Vec3, Vec3)> {
    if p_static && q_static {
        return None;
    }
    let diff = p - q;
    if diff.length_squared() >= radius * radius {
        return None;
    }
    let (normal, len) = separation(diff)?;
    let correction = (radius - len).min(max_step);

    match (p_static, q_static) {
        (false, true) => Some((normal * correction, Vec3::ZERO)),
        (true, false) => Some((Vec3::ZERO, -normal * correction)),
        _ => Some((normal * (0.5 * correction), -normal * (0.5 * correction))),
    }
}

/// Counters from one self-collision pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Candidate pairs read from the adjacency list
    pub candidates: usize,
    /// Pairs that received a correction
    pub resolved: usize,
    /// Pairs skipped because the particles coincide
    pub degenerate: usize,
}

/// Resolve every candidate pair of the adjacency list.
///
/// A pair closer than `thickness` is pushed back to `thickness`, unless the
/// two particles were already closer than that in the rest state (adjacent
/// mesh vertices), in which case the rest distance is the target. Pairs that
/// are no closer than at rest are left alone. Corrections are split by
/// inverse mass. `friction` then pulls each movable particle's substep
/// displacement toward the pair's average.
pub fn solve_collisions(
    adjacency: &AdjacencyList,
    particles: &mut ParticleSet,
    thickness: f32,
    friction: f32,
) -> CollisionReport {
    let thickness_sq = thickness * thickness;
    let mut report = CollisionReport::default();

    for i in 0..adjacency.particle_count().min(particles.count) {
        for &j in adjacency.query(i) {
            let j = j as usize;
            if j == i || j >= particles.count {
                continue;
            }
            report.candidates += 1;

            let w_i = particles.inv_mass[i];
            let w_j = particles.inv_mass[j];
            let w_sum = w_i + w_j;
            if w_sum <= 0.0 {
                continue;
            }

            let diff = particles.position[i] - particles.position[j];
            let dist_sq = diff.length_squared();
            if dist_sq > thickness_sq {
                continue;
            }
            let rest_dist_sq =
                (particles.rest_position[i] - particles.rest_position[j]).length_squared();
            if dist_sq > rest_dist_sq {
                continue;
            }
            let target = if rest_dist_sq < thickness_sq {
                rest_dist_sq.sqrt()
            } else {
                thickness
            };

            let Some((normal, dist)) = separation(diff) else {
                report.degenerate += 1;
                continue;
            };

            let correction = normal * ((target - dist) / w_sum);
            particles.position[i] += correction * w_i;
            particles.position[j] -= correction * w_j;

            // Friction: blend both substep displacements toward their mean.
            let v_i = particles.position[i] - particles.old_position[i];
            let v_j = particles.position[j] - particles.old_position[j];
            let avg = (v_i + v_j) * 0.5;
            if w_i > 0.0 {
                particles.position[i] += (avg - v_i) * friction;
            }
            if w_j > 0.0 {
                particles.position[j] += (avg - v_j) * friction;
            }
            report.resolved += 1;
        }
    }
    report
}
