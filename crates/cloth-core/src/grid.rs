use std::ops::Range;

use glam::Vec3;

use crate::adjacency::AdjacencyList;
use crate::constraints::contact::direct_correction;
use crate::particle::Phase;

/// Empty slot in the packed particle map.
pub const INVALID_INDEX: u32 = u32::MAX;

const PRIME_X: i64 = 92_837_111;
const PRIME_Y: i64 = 689_287_499;
const PRIME_Z: i64 = 283_923_481;

/// Outcome of packing particles into the flat map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackReport {
    pub packed: usize,
    /// Writes dropped because they fell outside the map or the cell's run
    pub overflowed: usize,
}

/// Uniform spatial hash over 3D space.
///
/// Built with a counting sort: count particles per cell -> inclusive prefix
/// sum -> scatter into a flat, cell-ordered particle map. Must be rebuilt
/// every time positions change, before any query.
pub struct SpatialHashGrid {
    cell_size: f32,
    inv_cell_size: f32,
    table_multiplier: usize,
    table_size: usize,
    /// Per-cell counts; after `partial_sum`, cell_count[h] = particles in cells [0..=h].
    /// One extra trailing slot holds the total.
    cell_count: Vec<u32>,
    /// Scatter offsets within each cell's run
    cell_cursor: Vec<u32>,
    /// Particle indices sorted by cell
    particle_map: Vec<u32>,
    /// Cell of each inserted particle (transient membership)
    particle_hashes: Vec<u32>,
    inserted: usize,
    /// Hashed cells visited by one adjacency query
    query_cells: Vec<usize>,
}

impl SpatialHashGrid {
    /// Create a grid for up to `max_particles` particles.
    ///
    /// The table holds `max_particles * table_multiplier + 1` cells; a
    /// multiplier around 5 balances collision rate against memory.
    pub fn new(cell_size: f32, table_multiplier: usize, max_particles: usize) -> Self {
        let table_multiplier = table_multiplier.max(1);
        let table_size = max_particles * table_multiplier + 1;
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            table_multiplier,
            table_size,
            cell_count: vec![0u32; table_size + 1],
            cell_cursor: vec![0u32; table_size],
            particle_map: vec![INVALID_INDEX; max_particles],
            particle_hashes: vec![0u32; max_particles],
            inserted: 0,
            query_cells: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Particle slots available in the packed map.
    pub fn capacity(&self) -> usize {
        self.particle_map.len()
    }

    /// Prefix sums after `partial_sum` (length `table_size + 1`).
    pub fn prefix_sums(&self) -> &[u32] {
        &self.cell_count
    }

    /// Packed, cell-ordered particle indices.
    pub fn particle_map(&self) -> &[u32] {
        &self.particle_map
    }

    /// Grow the map (and the table with it) so `count` particles fit.
    ///
    /// Growth is geometric so a slowly increasing particle count does not
    /// reallocate every step.
    pub fn ensure_capacity(&mut self, count: usize) {
        if count <= self.particle_map.len() {
            return;
        }
        let new_capacity = count.max(self.particle_map.len() * 2);
        ftlog::info!(
            "spatial hash grows from {} to {} particle slots",
            self.particle_map.len(),
            new_capacity
        );
        self.table_size = new_capacity * self.table_multiplier + 1;
        self.cell_count.resize(self.table_size + 1, 0);
        self.cell_cursor.resize(self.table_size, 0);
        self.particle_map.resize(new_capacity, INVALID_INDEX);
        self.particle_hashes.resize(new_capacity, 0);
    }

    /// Run the full rebuild protocol for `positions`.
    pub fn rebuild(&mut self, positions: &[Vec3]) -> PackReport {
        self.ensure_capacity(positions.len());
        self.clear();
        self.insert_particles(positions);
        self.partial_sum();
        self.insert_particle_map()
    }

    /// 1. Reset every cell count and empty the packed map.
    pub fn clear(&mut self) {
        self.cell_count.fill(0);
        self.particle_map.fill(INVALID_INDEX);
        self.inserted = 0;
    }

    /// 2. Count particles per cell and remember each particle's cell.
    pub fn insert_particles(&mut self, positions: &[Vec3]) {
        if self.particle_hashes.len() < positions.len() {
            self.particle_hashes.resize(positions.len(), 0);
        }
        for (i, &p) in positions.iter().enumerate() {
            let h = self.hash_pos(p);
            self.particle_hashes[i] = h as u32;
            self.cell_count[h] += 1;
        }
        self.inserted = positions.len();
    }

    /// 3. Turn per-cell counts into an inclusive running total.
    ///
    /// Particles of cell `h` then occupy `[cell_count[h - 1], cell_count[h])`
    /// of the map, and the trailing slot holds the total particle count.
    pub fn partial_sum(&mut self) {
        for h in 1..=self.table_size {
            self.cell_count[h] += self.cell_count[h - 1];
        }
    }

    /// 4. Scatter particle indices into their cell's run of the map.
    ///
    /// A write that would land past the map or past the cell's run is
    /// dropped and counted; no other cell is touched.
    pub fn insert_particle_map(&mut self) -> PackReport {
        self.cell_cursor.fill(0);
        let mut report = PackReport::default();
        for i in 0..self.inserted {
            let h = self.particle_hashes[i] as usize;
            let start = self.run_start(h);
            let write = start + self.cell_cursor[h] as usize;
            if write >= self.cell_count[h] as usize || write >= self.particle_map.len() {
                report.overflowed += 1;
                continue;
            }
            self.particle_map[write] = i as u32;
            self.cell_cursor[h] += 1;
            report.packed += 1;
        }
        if report.overflowed > 0 {
            ftlog::warn!(
                "particle map overflow: {} of {} particles dropped (capacity {})",
                report.overflowed,
                self.inserted,
                self.particle_map.len()
            );
        }
        report
    }

    /// Map slots holding the particles of cell `h`.
    ///
    /// Out-of-table cells yield an empty range; the run is clipped to the map.
    pub fn cell_range(&self, h: usize) -> Range<usize> {
        if h >= self.table_size {
            return 0..0;
        }
        let start = self.run_start(h);
        let end = (self.cell_count[h] as usize).min(self.particle_map.len());
        if start >= end {
            return 0..0;
        }
        start..end
    }

    /// Number of particles in cell `h` (prefix-sum difference).
    pub fn cell_population(&self, h: usize) -> usize {
        self.cell_range(h).len()
    }

    /// Cell index of a world position.
    #[inline]
    pub fn hash_pos(&self, pos: Vec3) -> usize {
        let (cx, cy, cz) = self.cell_coords(pos);
        self.hash_cell(cx, cy, cz)
    }

    /// Radius probe for one particle: scan the `(2r+1)^3` cell block around
    /// it and push every overlapping neighbor apart immediately.
    ///
    /// A block with at least as many cells as the table covers every hashed
    /// cell, so the whole table is scanned once instead. Returns the number
    /// of corrections applied. `phase` marks the static particles that must
    /// not be pushed.
    pub fn query_and_collide(
        &self,
        i: usize,
        radius: f32,
        max_step: f32,
        positions: &mut [Vec3],
        phase: &[Phase],
    ) -> usize {
        let Some(&pos) = positions.get(i) else {
            ftlog::warn!("radius probe for missing particle {}", i);
            return 0;
        };
        if !pos.is_finite() {
            return 0;
        }
        let (x, y, z) = self.cell_coords(pos);
        let r = (radius * self.inv_cell_size).ceil().max(0.0) as i32;
        let side = 2 * i64::from(r) + 1;
        let mut applied = 0;

        if self.covers_table(side, side, side) {
            for h in 0..self.table_size {
                applied += self.collide_in_cell(h, i, radius, max_step, positions, phase);
            }
            return applied;
        }

        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    let h = self.hash_cell(x.wrapping_add(dx), y.wrapping_add(dy), z.wrapping_add(dz));
                    applied += self.collide_in_cell(h, i, radius, max_step, positions, phase);
                }
            }
        }
        applied
    }

    /// Push particle `i` apart from every overlapping particle packed in cell `h`.
    fn collide_in_cell(
        &self,
        h: usize,
        i: usize,
        radius: f32,
        max_step: f32,
        positions: &mut [Vec3],
        phase: &[Phase],
    ) -> usize {
        let is_static = |k: usize| phase.get(k) == Some(&Phase::Static);
        let mut applied = 0;
        for k in self.cell_range(h) {
            let j = self.particle_map[k];
            if j == INVALID_INDEX || j as usize == i || j as usize >= positions.len() {
                continue;
            }
            let j = j as usize;
            let correction = direct_correction(
                positions[i],
                positions[j],
                is_static(i),
                is_static(j),
                radius,
                max_step,
            );
            if let Some((dp_i, dp_j)) = correction {
                positions[i] += dp_i;
                positions[j] += dp_j;
                applied += 1;
            }
        }
        applied
    }

    /// Radius probe for every packed particle, in map (cell) order.
    pub fn query_and_collide_all(
        &self,
        radius: f32,
        max_step: f32,
        positions: &mut [Vec3],
        phase: &[Phase],
    ) -> usize {
        let mut applied = 0;
        for k in 0..self.particle_map.len() {
            let i = self.particle_map[k];
            if i == INVALID_INDEX {
                continue;
            }
            applied += self.query_and_collide(i as usize, radius, max_step, positions, phase);
        }
        applied
    }

    /// Build the adjacency list: for every particle, all lower-indexed
    /// particles within `max_dist`.
    ///
    /// Each hashed cell is visited once per particle even when several cell
    /// coordinates of the search box collide onto it, so no pair is listed
    /// twice. A search box with at least as many cells as the table is
    /// replaced by the whole table. Returns the number of pairs stored.
    pub fn query_all(
        &mut self,
        positions: &[Vec3],
        max_dist: f32,
        adjacency: &mut AdjacencyList,
    ) -> usize {
        let n = positions.len().min(self.inserted);
        let max_dist_sq = max_dist * max_dist;
        let reach = Vec3::splat(max_dist);
        let mut cells = std::mem::take(&mut self.query_cells);

        adjacency.begin(n);
        for i in 0..n {
            adjacency.open(i);
            let p = positions[i];
            if !p.is_finite() {
                continue;
            }
            let (x0, y0, z0) = self.cell_coords(p - reach);
            let (x1, y1, z1) = self.cell_coords(p + reach);

            cells.clear();
            let extent = |lo: i32, hi: i32| i64::from(hi) - i64::from(lo) + 1;
            if self.covers_table(extent(x0, x1), extent(y0, y1), extent(z0, z1)) {
                cells.extend(0..self.table_size);
            } else {
                for x in x0..=x1 {
                    for y in y0..=y1 {
                        for z in z0..=z1 {
                            cells.push(self.hash_cell(x, y, z));
                        }
                    }
                }
                cells.sort_unstable();
                cells.dedup();
            }

            for &h in &cells {
                for k in self.cell_range(h) {
                    let j = self.particle_map[k];
                    // Lower index only: each unordered pair is stored once, never with itself.
                    if j == INVALID_INDEX || j as usize >= i {
                        continue;
                    }
                    let dist_sq = (positions[j as usize] - p).length_squared();
                    if !(dist_sq <= max_dist_sq) {
                        continue;
                    }
                    adjacency.push(j);
                }
            }
        }
        adjacency.finish(n);

        self.query_cells = cells;
        adjacency.pair_count()
    }

    /// Whether a cell box of the given extents has at least `table_size` cells.
    #[inline]
    fn covers_table(&self, nx: i64, ny: i64, nz: i64) -> bool {
        let table = self.table_size as i64;
        nx.saturating_mul(ny).saturating_mul(nz) >= table
    }

    /// Start of cell `h`'s run in the map.
    #[inline]
    fn run_start(&self, h: usize) -> usize {
        if h == 0 {
            0
        } else {
            self.cell_count[h - 1] as usize
        }
    }

    /// Hash function: cell coords -> table index
    #[inline]
    fn hash_cell(&self, cx: i32, cy: i32, cz: i32) -> usize {
        let h = (cx as i64).wrapping_mul(PRIME_X)
            ^ (cy as i64).wrapping_mul(PRIME_Y)
            ^ (cz as i64).wrapping_mul(PRIME_Z);
        (h.unsigned_abs() % self.table_size as u64) as usize
    }

    /// Convert world position to cell coordinates
    #[inline]
    fn cell_coords(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
            (pos.z * self.inv_cell_size).floor() as i32,
        )
    }
}
