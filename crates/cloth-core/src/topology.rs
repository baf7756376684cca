//! Triangle topology: structural edges, bending pairs and vertex welding.
//!
//! Everything is keyed on vertex indices. Meshes whose vertices are split
//! along UV seams or normals should be welded first so that triangles sharing
//! a geometric edge also share its indices.

use std::collections::HashMap;

use glam::Vec3;

use crate::constraints::distance::DistanceConstraint;
use crate::constraints::ConstraintSet;

/// Edge and bending-pair lists derived from a triangle mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshTopology {
    /// Unique undirected edges, `[lo, hi]`, in first-seen order
    pub edges: Vec<[u32; 2]>,
    /// Opposite vertices of every pair of triangles sharing an edge
    pub bending_pairs: Vec<[u32; 2]>,
}

impl MeshTopology {
    /// Walk the triangles once, collecting each edge with the vertices
    /// opposite it.
    ///
    /// Triangles that repeat a vertex are skipped. An edge shared by more than
    /// two triangles produces a bending pair for every combination.
    pub fn from_triangles(triangles: &[[u32; 3]], vertex_count: usize) -> Result<Self, String> {
        let mut order: Vec<(u32, u32)> = Vec::new();
        let mut opposite: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
        let mut degenerate = 0usize;

        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(format!(
                    "triangle {t} references vertex {bad} but the mesh has {vertex_count} vertices"
                ));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                degenerate += 1;
                continue;
            }
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let far = tri[(k + 2) % 3];
                let key = (a.min(b), a.max(b));
                let entry = opposite.entry(key).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                entry.push(far);
            }
        }
        if degenerate > 0 {
            ftlog::debug!("skipped {} degenerate triangles", degenerate);
        }

        let mut topology = Self::default();
        for key in order {
            topology.edges.push([key.0, key.1]);
            let far = &opposite[&key];
            for a in 0..far.len() {
                for b in (a + 1)..far.len() {
                    if far[a] != far[b] {
                        topology.bending_pairs.push([far[a], far[b]]);
                    }
                }
            }
        }
        Ok(topology)
    }

    /// Distance constraints with rest lengths measured on `positions`.
    pub fn constraints(&self, positions: &[Vec3]) -> ConstraintSet {
        let build = |pairs: &[[u32; 2]]| -> Vec<DistanceConstraint> {
            pairs
                .iter()
                .map(|&[i, j]| DistanceConstraint::from_positions(i, j, positions))
                .collect()
        };
        ConstraintSet::new(build(&self.edges), build(&self.bending_pairs))
    }
}

/// Merge vertices that fall into the same `tolerance`-sized bucket.
///
/// Returns the welded positions and the remapped triangles; triangles that
/// collapse onto fewer than three distinct vertices are dropped. A
/// non-positive tolerance merges only bit-identical positions.
pub fn weld_vertices(
    positions: &[Vec3],
    triangles: &[[u32; 3]],
    tolerance: f32,
) -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let key = |p: Vec3| -> (i64, i64, i64) {
        if tolerance > 0.0 {
            let inv = 1.0 / tolerance;
            (
                (p.x * inv).round() as i64,
                (p.y * inv).round() as i64,
                (p.z * inv).round() as i64,
            )
        } else {
            (p.x.to_bits() as i64, p.y.to_bits() as i64, p.z.to_bits() as i64)
        }
    };

    let mut welded = Vec::with_capacity(positions.len());
    let mut remap = Vec::with_capacity(positions.len());
    let mut seen: HashMap<(i64, i64, i64), u32> = HashMap::new();
    for &p in positions {
        let id = *seen.entry(key(p)).or_insert_with(|| {
            welded.push(p);
            (welded.len() - 1) as u32
        });
        remap.push(id);
    }

    let triangles = triangles
        .iter()
        .filter_map(|tri| {
            let t = [
                *remap.get(tri[0] as usize)?,
                *remap.get(tri[1] as usize)?,
                *remap.get(tri[2] as usize)?,
            ];
            (t[0] != t[1] && t[1] != t[2] && t[0] != t[2]).then_some(t)
        })
        .collect();

    (welded, triangles)
}
