use glam::Vec3;

/// Phase decides whether a particle takes part in integration.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Dynamic = 0, // Integrated, projected and collided
    Static  = 1, // Infinite mass, immovable (pushes but is never pushed)
}

/// SoA particle storage.
///
/// A particle's index is its identity: the hash, the adjacency list and the
/// constraint sets all refer to particles by index, so nothing is ever removed
/// or reordered once the set is handed to the solver.
#[derive(Clone, Debug, Default)]
pub struct ParticleSet {
    pub count: usize,
    pub position: Vec<Vec3>,
    /// Position at the start of the current substep
    pub old_position: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// Inverse mass (0.0 = static/immovable)
    pub inv_mass: Vec<f32>,
    /// Ground and self-collision thickness
    pub radius: Vec<f32>,
    /// Undeformed position, used to tell rest-state neighbors from real contacts
    pub rest_position: Vec<Vec3>,
    pub phase: Vec<Phase>,
}

impl ParticleSet {
    /// `count` dynamic unit-mass particles at the origin.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            position: vec![Vec3::ZERO; count],
            old_position: vec![Vec3::ZERO; count],
            velocity: vec![Vec3::ZERO; count],
            inv_mass: vec![1.0; count],
            radius: vec![0.03; count],
            rest_position: vec![Vec3::ZERO; count],
            phase: vec![Phase::Dynamic; count],
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            count: 0,
            position: Vec::with_capacity(capacity),
            old_position: Vec::with_capacity(capacity),
            velocity: Vec::with_capacity(capacity),
            inv_mass: Vec::with_capacity(capacity),
            radius: Vec::with_capacity(capacity),
            rest_position: Vec::with_capacity(capacity),
            phase: Vec::with_capacity(capacity),
        }
    }

    /// Append a particle resting at `position` and return its index.
    ///
    /// A non-positive (or non-finite) `mass` yields an immovable particle.
    pub fn push(&mut self, position: Vec3, mass: f32, radius: f32) -> u32 {
        let index = self.count as u32;
        let movable = mass > 0.0 && mass.is_finite();
        self.position.push(position);
        self.old_position.push(position);
        self.velocity.push(Vec3::ZERO);
        self.inv_mass.push(if movable { 1.0 / mass } else { 0.0 });
        self.radius.push(radius);
        self.rest_position.push(position);
        self.phase.push(if movable { Phase::Dynamic } else { Phase::Static });
        self.count += 1;
        index
    }

    /// Pin particle `i` in place.
    pub fn set_static(&mut self, i: usize) {
        self.phase[i] = Phase::Static;
        self.inv_mass[i] = 0.0;
        self.velocity[i] = Vec3::ZERO;
    }

    /// Static particles and zero-inverse-mass particles are skipped by integration.
    #[inline]
    pub fn is_movable(&self, i: usize) -> bool {
        self.phase[i] == Phase::Dynamic && self.inv_mass[i] > 0.0
    }

    #[inline]
    pub fn is_static(&self, i: usize) -> bool {
        self.phase[i] == Phase::Static
    }

    pub fn static_count(&self) -> usize {
        self.phase.iter().filter(|&&p| p == Phase::Static).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Rest positions are captured at load time; call this after editing
    /// `position` directly if the edited layout is the undeformed one.
    pub fn capture_rest_state(&mut self) {
        self.rest_position.copy_from_slice(&self.position);
        self.old_position.copy_from_slice(&self.position);
    }
}
