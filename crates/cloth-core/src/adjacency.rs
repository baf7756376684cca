/// Per-step neighbor candidates, stored CSR-style.
///
/// Particle `i`'s neighbors live in `adj_ids[first_adj_id[i]..first_adj_id[i + 1]]`.
/// Only lower-indexed neighbors are stored, so every unordered pair appears
/// once. The neighbor array has a fixed number of slots; pairs beyond it are
/// dropped for the current step and the array doubles before the next one.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyList {
    first_adj_id: Vec<u32>,
    adj_ids: Vec<u32>,
    len: usize,
    overflowed: usize,
}

impl AdjacencyList {
    pub fn new(max_particles: usize, per_particle: usize) -> Self {
        Self {
            first_adj_id: vec![0; max_particles + 1],
            adj_ids: vec![0; max_particles * per_particle.max(1)],
            len: 0,
            overflowed: 0,
        }
    }

    /// Reset for a build over `n` particles.
    pub fn begin(&mut self, n: usize) {
        self.first_adj_id.clear();
        self.first_adj_id.resize(n + 1, 0);
        self.len = 0;
        self.overflowed = 0;
    }

    /// Start particle `i`'s range at the current end of the array.
    #[inline]
    pub fn open(&mut self, i: usize) {
        self.first_adj_id[i] = self.len as u32;
    }

    /// Append a neighbor to the open range. Returns false when the array is full.
    #[inline]
    pub fn push(&mut self, j: u32) -> bool {
        if self.len >= self.adj_ids.len() {
            self.overflowed += 1;
            return false;
        }
        self.adj_ids[self.len] = j;
        self.len += 1;
        true
    }

    /// Close the last range and grow for the next build if anything was dropped.
    pub fn finish(&mut self, n: usize) {
        self.first_adj_id[n] = self.len as u32;
        if self.overflowed > 0 {
            let new_len = (self.adj_ids.len() * 2).max(self.len + self.overflowed);
            ftlog::warn!(
                "adjacency overflow: {} pairs dropped, growing {} -> {} slots",
                self.overflowed,
                self.adj_ids.len(),
                new_len
            );
            self.adj_ids.resize(new_len, 0);
        }
    }

    /// Lower-indexed neighbors of particle `i`.
    ///
    /// An out-of-bounds or inverted range is logged and reads as empty.
    pub fn query(&self, i: usize) -> &[u32] {
        if i + 1 >= self.first_adj_id.len() {
            ftlog::warn!(
                "adjacency query for particle {} outside {} ranges",
                i,
                self.particle_count()
            );
            return &[];
        }
        let start = self.first_adj_id[i] as usize;
        let end = self.first_adj_id[i + 1] as usize;
        if start > end || end > self.len {
            ftlog::warn!("invalid adjacency range [{}, {}) for particle {}", start, end, i);
            return &[];
        }
        &self.adj_ids[start..end]
    }

    /// Number of particles with a range.
    pub fn particle_count(&self) -> usize {
        self.first_adj_id.len().saturating_sub(1)
    }

    /// Total stored pairs.
    pub fn pair_count(&self) -> usize {
        self.len
    }

    /// Pairs dropped by the last build.
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }

    /// Neighbor slots available to the next build.
    pub fn capacity(&self) -> usize {
        self.adj_ids.len()
    }

    /// Every stored pair as `(i, j)` with `j < i`.
    pub fn pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.particle_count())
            .flat_map(move |i| self.query(i).iter().map(move |&j| (i as u32, j)))
    }
}
