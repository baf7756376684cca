use crate::config::SimConfig;

/// Fabric preset for quick configuration of cloth behavior.
#[derive(Clone, Copy, Debug)]
pub struct FabricPreset {
    pub name: &'static str,
    pub stretch_compliance: f32,
    pub bend_compliance: f32,
    pub thickness: f32,
    pub friction: f32,
    /// Mass per particle in kg
    pub particle_mass: f32,
}

impl FabricPreset {
    /// Cotton: inextensible, soft folds.
    pub const COTTON: Self = Self {
        name: "cotton",
        stretch_compliance: 0.0,
        bend_compliance: 1.0,
        thickness: 0.05,
        friction: 0.1,
        particle_mass: 1.0,
    };

    /// Silk: light and slippery, folds easily.
    pub const SILK: Self = Self {
        name: "silk",
        stretch_compliance: 1.0e-6,
        bend_compliance: 10.0,
        thickness: 0.03,
        friction: 0.02,
        particle_mass: 0.3,
    };

    /// Denim: heavy and stiff against bending.
    pub const DENIM: Self = Self {
        name: "denim",
        stretch_compliance: 0.0,
        bend_compliance: 0.01,
        thickness: 0.06,
        friction: 0.3,
        particle_mass: 2.0,
    };

    /// Jersey: knit fabric that stretches noticeably.
    pub const JERSEY: Self = Self {
        name: "jersey",
        stretch_compliance: 1.0e-4,
        bend_compliance: 2.0,
        thickness: 0.05,
        friction: 0.15,
        particle_mass: 0.8,
    };

    pub const ALL: [Self; 4] = [Self::COTTON, Self::SILK, Self::DENIM, Self::JERSEY];

    /// Look a preset up by its lowercase name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Apply this preset's material knobs to a config.
    pub fn apply_to(&self, config: &mut SimConfig) {
        config.stretch_compliance = self.stretch_compliance;
        config.bend_compliance = self.bend_compliance;
        config.thickness = self.thickness;
        config.friction = self.friction;
    }
}
