use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;

/// Per-particle correction accumulator for Jacobi-style projection.
///
/// Constraint passes only read positions and add their corrections here, so
/// two constraints sharing a particle can run on different threads. Floats
/// are stored as bit patterns and added with a compare-exchange loop.
pub struct CorrectionBuffer {
    x: Vec<AtomicU32>,
    y: Vec<AtomicU32>,
    z: Vec<AtomicU32>,
    counts: Vec<AtomicU32>,
}

#[inline]
fn atomic_add_f32(cell: &AtomicU32, value: f32) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn zeroed(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

impl CorrectionBuffer {
    pub fn new(count: usize) -> Self {
        Self {
            x: zeroed(count),
            y: zeroed(count),
            z: zeroed(count),
            counts: zeroed(count),
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Resize to `count` particles and zero every slot.
    pub fn reset(&mut self, count: usize) {
        if self.counts.len() != count {
            *self = Self::new(count);
            return;
        }
        for slot in self.x.iter_mut().chain(&mut self.y).chain(&mut self.z).chain(&mut self.counts) {
            *slot.get_mut() = 0;
        }
    }

    /// Add one constraint's correction for particle `i`.
    #[inline]
    pub fn add(&self, i: usize, delta: Vec3) {
        atomic_add_f32(&self.x[i], delta.x);
        atomic_add_f32(&self.y[i], delta.y);
        atomic_add_f32(&self.z[i], delta.z);
        self.counts[i].fetch_add(1, Ordering::Relaxed);
    }

    /// Accumulated (sum, count) for particle `i`.
    pub fn get(&self, i: usize) -> (Vec3, u32) {
        let sum = Vec3::new(
            f32::from_bits(self.x[i].load(Ordering::Relaxed)),
            f32::from_bits(self.y[i].load(Ordering::Relaxed)),
            f32::from_bits(self.z[i].load(Ordering::Relaxed)),
        );
        (sum, self.counts[i].load(Ordering::Relaxed))
    }

    /// Apply `sum / (count + regularization)` to every particle that received
    /// a correction, then zero the buffer.
    ///
    /// Averaging keeps heavily shared particles from overshooting; the
    /// regularization term damps it further. Zero inverse mass never moves.
    pub fn apply(&mut self, positions: &mut [Vec3], inv_mass: &[f32], regularization: f32) {
        for (i, p) in positions.iter_mut().enumerate().take(self.len()) {
            let count = *self.counts[i].get_mut();
            if count == 0 {
                continue;
            }
            let sum = Vec3::new(
                f32::from_bits(*self.x[i].get_mut()),
                f32::from_bits(*self.y[i].get_mut()),
                f32::from_bits(*self.z[i].get_mut()),
            );
            if inv_mass[i] > 0.0 && sum.is_finite() {
                *p += sum / (count as f32 + regularization);
            }
            *self.x[i].get_mut() = 0;
            *self.y[i].get_mut() = 0;
            *self.z[i].get_mut() = 0;
            *self.counts[i].get_mut() = 0;
        }
    }
}
