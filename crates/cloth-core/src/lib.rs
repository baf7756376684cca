//! XPBD cloth simulation with a counting-sort spatial hash for
//! self-collision.

pub mod adjacency;
pub mod config;
pub mod constraints;
pub mod export;
pub mod grid;
pub mod materials;
pub mod math;
pub mod particle;
pub mod quality;
pub mod scene;
pub mod solver;
pub mod topology;

pub use config::{CollisionMode, SimConfig, SolveMode};
pub use particle::{ParticleSet, Phase};
pub use quality::StepStats;
pub use scene::{MeshModel, ModelRange, SceneBuilder};
pub use solver::Solver;
