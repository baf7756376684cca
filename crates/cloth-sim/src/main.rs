//! Headless cloth drop: a sheet falls onto a static patch and the ground.

pub mod utils;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use glam::Vec3;

use cloth_core::export::{as_bytes, write_render_buffer, RenderVertex};
use cloth_core::materials::FabricPreset;
use cloth_core::quality::AdaptiveQuality;
use cloth_core::{CollisionMode, MeshModel, SceneBuilder, SimConfig, SolveMode, StepStats};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Collision {
    /// Adjacency list with rest-state filtering and friction
    Adjacency,
    /// Direct radius probe over hashed cells
    Probe,
    /// No self-collision
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Solve {
    GaussSeidel,
    Jacobi,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of frames to simulate.
    #[arg(short('f'), long, default_value_t = 240)]
    frames: usize,

    /// Frame time step in seconds.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Vertices along each side of the cloth.
    #[arg(short('r'), long, default_value_t = 40)]
    resolution: usize,

    /// Substeps per frame.
    #[arg(short('s'), long)]
    substeps: Option<u32>,

    /// Constraint iterations per substep.
    #[arg(short('i'), long)]
    iterations: Option<u32>,

    /// Self-collision thickness; overrides the fabric preset.
    #[arg(short('t'), long)]
    thickness: Option<f32>,

    /// Fabric preset: cotton, silk, denim or jersey.
    #[arg(long, default_value = "cotton")]
    fabric: String,

    #[arg(long, value_enum, default_value_t = Collision::Adjacency)]
    collision: Collision,

    #[arg(long, value_enum, default_value_t = Solve::GaussSeidel)]
    solve: Solve,

    /// Pin the two far corners instead of dropping the sheet.
    #[arg(long)]
    pin_corners: bool,

    /// Enable adaptive quality with this solver budget in milliseconds.
    #[arg(long)]
    budget_ms: Option<f32>,

    /// Write the final render buffer to this file.
    #[arg(short('o'), long)]
    out_path: Option<PathBuf>,

    /// Directory for log files.
    #[arg(long, default_value = "logs")]
    logs_dir: PathBuf,

    /// The name of the log-file to use.
    #[arg(short('l'), long, default_value = "cloth-sim.log")]
    log_name: String,

    /// Log at debug level.
    #[arg(short('v'), long)]
    verbose: bool,
}

fn build_config(args: &Args, fabric: &FabricPreset) -> SimConfig {
    let mut config = SimConfig::default();
    fabric.apply_to(&mut config);
    if let Some(substeps) = args.substeps {
        config.substeps = substeps;
    }
    if let Some(iterations) = args.iterations {
        config.solver_iterations = iterations;
    }
    if let Some(thickness) = args.thickness {
        config.thickness = thickness;
    }
    config.solve_mode = match args.solve {
        Solve::GaussSeidel => SolveMode::GaussSeidel,
        Solve::Jacobi => SolveMode::Jacobi,
    };
    match args.collision {
        Collision::Adjacency => config.collision_mode = CollisionMode::Adjacency,
        Collision::Probe => config.collision_mode = CollisionMode::RadiusProbe,
        Collision::Off => config.self_collision = false,
    }
    config
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let (_guard, log_path) = utils::configure_logger(&args.log_name, &args.logs_dir, args.verbose)?;
    ftlog::info!("Log file: {log_path:?}");

    let fabric = FabricPreset::by_name(&args.fabric)
        .ok_or_else(|| format!("unknown fabric `{}`", args.fabric))?;
    let config = build_config(&args, &fabric);

    let res = args.resolution.max(2);
    let mut sheet = MeshModel::cloth_grid("sheet", Vec3::new(-1.0, 1.5, -1.0), 2.0, 2.0, res, res)
        .with_mass(fabric.particle_mass)
        .with_radius(config.thickness);
    if args.pin_corners {
        let last = (res * res - 1) as u32;
        sheet = sheet.with_pinned(vec![last + 1 - res as u32, last]);
    }
    let table = MeshModel::cloth_grid("table", Vec3::new(-0.4, 0.6, -0.4), 0.8, 0.8, 9, 9)
        .with_static(true)
        .with_radius(config.thickness);

    let mut scene = SceneBuilder::new();
    scene.add_model(&sheet)?;
    scene.add_model(&table)?;
    let mut solver = scene.build(config)?;

    let mut quality = AdaptiveQuality::from_config(solver.config());
    if let Some(budget) = args.budget_ms {
        quality.budget_ms = budget;
        quality.enabled = true;
    }

    let mut totals = StepStats::default();
    let mut total_ms = 0.0;
    for frame in 0..args.frames {
        let stats = solver.step(args.dt);
        total_ms += stats.total_ms;
        totals.contacts += stats.contacts;
        totals.ground_contacts += stats.ground_contacts;
        totals.skipped += stats.skipped;
        totals.hash_overflows += stats.hash_overflows;
        totals.adjacency_overflows += stats.adjacency_overflows;

        if frame % 60 == 0 {
            ftlog::info!(
                "frame {frame}: {:.2} ms, {} substeps x {} iterations, {} pairs, {} contacts",
                stats.total_ms,
                stats.substeps,
                stats.iterations,
                stats.adjacency_pairs,
                stats.contacts
            );
        } else {
            ftlog::debug!("frame {frame}: {stats:?}");
        }

        if quality.enabled {
            quality.update(&stats);
            let mut config = solver.config().clone();
            quality.apply_to(&mut config);
            solver.set_config(config)?;
        }
    }

    let lowest = solver
        .positions()
        .iter()
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min);
    let average = if args.frames > 0 { total_ms / args.frames as f32 } else { 0.0 };
    ftlog::info!(
        "done: {} frames, {average:.3} ms/frame, lowest y {lowest:.4}, {} contacts, {} ground, {} skipped, {} hash / {} adjacency overflows",
        args.frames,
        totals.contacts,
        totals.ground_contacts,
        totals.skipped,
        totals.hash_overflows,
        totals.adjacency_overflows
    );
    println!(
        "{} particles, {} frames, {average:.3} ms/frame, lowest y {lowest:.4}",
        solver.particles().count, args.frames
    );

    if let Some(path) = &args.out_path {
        let mut buffer: Vec<RenderVertex> = Vec::new();
        write_render_buffer(solver.particles(), &mut buffer);
        std::fs::write(path, as_bytes(&buffer)).map_err(|e| e.to_string())?;
        ftlog::info!("wrote {} vertices to {path:?}", buffer.len());
    }

    Ok(())
}
