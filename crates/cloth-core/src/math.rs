use glam::Vec3;

/// Squared separation below which two particles are treated as coincident.
pub const DEGENERATE_DIST_SQ: f32 = 1.0e-8;

/// Edge length below which a distance constraint has no usable direction.
pub const DEGENERATE_LENGTH: f32 = 1.0e-6;

/// Clamp `v` to at most `max_len` while keeping its direction.
#[inline]
pub fn clamp_length(v: Vec3, max_len: f32) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq > max_len * max_len && len_sq > 0.0 {
        v * (max_len / len_sq.sqrt())
    } else {
        v
    }
}

/// Split a separation vector into (unit normal, length), or `None` when the
/// two points are too close to define a normal.
#[inline]
pub fn separation(diff: Vec3) -> Option<(Vec3, f32)> {
    let len_sq = diff.length_squared();
    if len_sq <= DEGENERATE_DIST_SQ || !len_sq.is_finite() {
        return None;
    }
    let len = len_sq.sqrt();
    Some((diff / len, len))
}
