use bytemuck::{Pod, Zeroable};

use crate::particle::ParticleSet;

/// Render vertex: 32 bytes, laid out for a vertex/storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RenderVertex {
    pub position: [f32; 3], // 12 bytes
    pub radius: f32,        //  4 bytes
    pub velocity: [f32; 3], // 12 bytes
    pub _pad: f32,          //  4 bytes
}

/// Refill `out` with one vertex per particle, in particle index order.
///
/// The buffer is resized to match; its allocation is reused between frames.
pub fn write_render_buffer(particles: &ParticleSet, out: &mut Vec<RenderVertex>) {
    out.resize(particles.count, RenderVertex::zeroed());
    for (i, v) in out.iter_mut().enumerate() {
        let pos = particles.position[i];
        let vel = particles.velocity[i];
        *v = RenderVertex {
            position: pos.to_array(),
            radius: particles.radius[i],
            velocity: vel.to_array(),
            _pad: 0.0,
        };
    }
}

/// Raw bytes of a render buffer, ready for upload.
pub fn as_bytes(vertices: &[RenderVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

/// Positions as a flat `[x0, y0, z0, x1, ...]` slice without copying.
pub fn positions_as_floats(particles: &ParticleSet) -> &[f32] {
    bytemuck::cast_slice(&particles.position)
}
