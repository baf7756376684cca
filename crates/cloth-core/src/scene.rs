//! Scene assembly: load triangle meshes into one particle arena.
//!
//! Every model's vertices are appended to the same `ParticleSet`, so a
//! particle's index is `range.first + vertex`. Static models become
//! immovable colliders with no constraints of their own.

use glam::Vec3;

use crate::config::SimConfig;
use crate::constraints::ConstraintSet;
use crate::particle::ParticleSet;
use crate::solver::Solver;
use crate::topology::{weld_vertices, MeshTopology};

/// An in-memory triangle mesh to simulate or collide against.
#[derive(Clone, Debug)]
pub struct MeshModel {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub is_static: bool,
    /// Mass of each vertex particle
    pub mass: f32,
    /// Collision radius of each vertex particle
    pub radius: f32,
    /// Vertices held in place on a dynamic model
    pub pinned: Vec<u32>,
}

impl MeshModel {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            positions,
            triangles,
            is_static: false,
            mass: 1.0,
            radius: 0.03,
            pinned: Vec::new(),
        }
    }

    /// Flat `width` x `depth` sheet in the XZ plane at `origin`, with
    /// `res_x` x `res_z` vertices and two triangles per quad.
    pub fn cloth_grid(
        name: impl Into<String>,
        origin: Vec3,
        width: f32,
        depth: f32,
        res_x: usize,
        res_z: usize,
    ) -> Self {
        let res_x = res_x.max(2);
        let res_z = res_z.max(2);
        let step_x = width / (res_x - 1) as f32;
        let step_z = depth / (res_z - 1) as f32;

        let mut positions = Vec::with_capacity(res_x * res_z);
        for z in 0..res_z {
            for x in 0..res_x {
                positions.push(origin + Vec3::new(x as f32 * step_x, 0.0, z as f32 * step_z));
            }
        }

        let mut triangles = Vec::with_capacity(2 * (res_x - 1) * (res_z - 1));
        for z in 0..res_z - 1 {
            for x in 0..res_x - 1 {
                let i00 = (z * res_x + x) as u32;
                let i10 = i00 + 1;
                let i01 = i00 + res_x as u32;
                let i11 = i01 + 1;
                triangles.push([i00, i10, i11]);
                triangles.push([i00, i11, i01]);
            }
        }

        Self::new(name, positions, triangles)
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_pinned(mut self, pinned: Vec<u32>) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn translated(mut self, offset: Vec3) -> Self {
        for p in &mut self.positions {
            *p += offset;
        }
        self
    }

    /// Merge split vertices so shared edges share indices. Pins are dropped
    /// since their vertex indices no longer apply.
    pub fn welded(mut self, tolerance: f32) -> Self {
        let (positions, triangles) = weld_vertices(&self.positions, &self.triangles, tolerance);
        self.positions = positions;
        self.triangles = triangles;
        self.pinned.clear();
        self
    }
}

/// Where a model's vertices landed in the particle arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRange {
    pub name: String,
    pub first: u32,
    pub count: u32,
    pub is_static: bool,
}

impl ModelRange {
    /// Arena index of the model's vertex `v`.
    pub fn particle(&self, v: u32) -> Option<u32> {
        (v < self.count).then(|| self.first + v)
    }
}

/// Accumulates models into a single particle arena and constraint set.
#[derive(Default)]
pub struct SceneBuilder {
    particles: ParticleSet,
    constraints: ConstraintSet,
    models: Vec<ModelRange>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a model's vertices and, for dynamic models, its structural and
    /// bending constraints.
    ///
    /// A model with no vertices or no triangles loads as an empty range.
    /// Triangle or pin indices outside the model are rejected before anything
    /// is appended.
    pub fn add_model(&mut self, model: &MeshModel) -> Result<ModelRange, String> {
        let first = self.particles.count as u32;
        let vertex_count = model.positions.len();

        if vertex_count == 0 || model.triangles.is_empty() {
            ftlog::info!(
                "model `{}` has {} vertices and {} triangles, loaded as empty",
                model.name,
                vertex_count,
                model.triangles.len()
            );
            let range = ModelRange {
                name: model.name.clone(),
                first,
                count: 0,
                is_static: model.is_static,
            };
            self.models.push(range.clone());
            return Ok(range);
        }

        if let Some(i) = model.positions.iter().position(|p| !p.is_finite()) {
            return Err(format!("model `{}`: vertex {i} is not finite", model.name));
        }
        if let Some(&pin) = model.pinned.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(format!(
                "model `{}`: pinned vertex {pin} out of range ({vertex_count} vertices)",
                model.name
            ));
        }
        let topology = MeshTopology::from_triangles(&model.triangles, vertex_count)
            .map_err(|e| format!("model `{}`: {e}", model.name))?;

        let mass = if model.is_static { 0.0 } else { model.mass };
        for &p in &model.positions {
            self.particles.push(p, mass, model.radius);
        }
        for &v in &model.pinned {
            self.particles.set_static((first + v) as usize);
        }

        if !model.is_static {
            let local = topology.constraints(&model.positions);
            self.constraints.extend_shifted(&local, first);
        }

        ftlog::info!(
            "model `{}`: {} vertices at {}, {} edges, {} bending pairs{}",
            model.name,
            vertex_count,
            first,
            topology.edges.len(),
            topology.bending_pairs.len(),
            if model.is_static { " (static)" } else { "" }
        );

        let range = ModelRange {
            name: model.name.clone(),
            first,
            count: vertex_count as u32,
            is_static: model.is_static,
        };
        self.models.push(range.clone());
        Ok(range)
    }

    pub fn models(&self) -> &[ModelRange] {
        &self.models
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Hand the arena to a new solver session.
    pub fn build(self, config: SimConfig) -> Result<Solver, String> {
        Solver::new(self.particles, self.constraints, config)
    }
}
