pub mod contact;
pub mod distance;
pub mod jacobi;

use distance::DistanceConstraint;

/// Structural and bending constraints of every model in a session.
///
/// Both sets are immutable for the life of the simulation; they are built
/// once from topology and handed to the solver.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    /// Triangle edges (stretch)
    pub structural: Vec<DistanceConstraint>,
    /// Opposite vertices of triangles sharing an edge (bending proxy)
    pub bending: Vec<DistanceConstraint>,
}

impl ConstraintSet {
    pub fn new(structural: Vec<DistanceConstraint>, bending: Vec<DistanceConstraint>) -> Self {
        Self { structural, bending }
    }

    pub fn len(&self) -> usize {
        self.structural.len() + self.bending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structural.is_empty() && self.bending.is_empty()
    }

    /// Append another set, shifting its particle indices by `offset`.
    pub fn extend_shifted(&mut self, other: &ConstraintSet, offset: u32) {
        self.structural
            .extend(other.structural.iter().map(|c| c.shifted(offset)));
        self.bending.extend(other.bending.iter().map(|c| c.shifted(offset)));
    }

    /// Check every constraint references one of `particle_count` particles
    /// and carries a usable rest length.
    pub fn validate(&self, particle_count: usize) -> Result<(), String> {
        for (kind, set) in [("structural", &self.structural), ("bending", &self.bending)] {
            for (k, c) in set.iter().enumerate() {
                if c.i as usize >= particle_count || c.j as usize >= particle_count {
                    return Err(format!(
                        "{kind} constraint {k} references ({}, {}) but only {particle_count} particles exist",
                        c.i, c.j
                    ));
                }
                if c.i == c.j {
                    return Err(format!("{kind} constraint {k} joins particle {} to itself", c.i));
                }
                if !(c.rest_length >= 0.0 && c.rest_length.is_finite()) {
                    return Err(format!(
                        "{kind} constraint {k} has invalid rest length {}",
                        c.rest_length
                    ));
                }
            }
        }
        Ok(())
    }
}
