use crate::config::SimConfig;

/// Quality knobs the budget controller trades for speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualityLevel {
    pub substeps: u32,
    pub iterations: u32,
    pub self_collision: bool,
}

impl QualityLevel {
    pub fn of(config: &SimConfig) -> Self {
        Self {
            substeps: config.substeps.max(1),
            iterations: config.solver_iterations.max(1),
            self_collision: config.self_collision,
        }
    }

    /// Work units of one frame at this level.
    ///
    /// Every substep predicts and ground-clamps each particle, projects each
    /// constraint once per iteration and, with self-collision, rebuilds the
    /// hash over all particles and resolves every adjacency pair.
    pub fn cost_units(&self, particles: u32, constraints: u32, pairs: u32) -> f32 {
        let mut per_substep = particles as f32 + constraints as f32 * self.iterations as f32;
        if self.self_collision {
            per_substep += particles as f32 + pairs as f32;
        }
        self.substeps as f32 * per_substep
    }
}

/// Frame budget controller.
///
/// Fits a cost per work unit to the measured step time and picks the best
/// level that is predicted to fit the budget. Levels form a ladder from full
/// quality down: iterations go first, then substeps, and self-collision is
/// disabled last. Quality is raised only when the predicted cost leaves
/// `RAISE_MARGIN` of the budget free, so a level near the limit does not
/// flip back and forth.
pub struct AdaptiveQuality {
    /// Target solver budget per frame in milliseconds.
    pub budget_ms: f32,
    pub enabled: bool,
    ladder: Vec<QualityLevel>,
    rung: usize,
    ms_per_unit: Option<f32>,
    /// Pair count from the last step that ran self-collision
    pairs: u32,
}

impl AdaptiveQuality {
    /// Fraction of the budget a higher level must fit in before it is chosen.
    pub const RAISE_MARGIN: f32 = 0.8;
    /// Weight of the newest sample in the smoothed unit cost.
    const SMOOTHING: f32 = 0.5;
    pub const DEFAULT_MIN_SUBSTEPS: u32 = 2;

    pub fn new(full: QualityLevel, min_substeps: u32) -> Self {
        let full = QualityLevel {
            substeps: full.substeps.max(1),
            iterations: full.iterations.max(1),
            ..full
        };
        let min_substeps = min_substeps.clamp(1, full.substeps);

        let mut ladder = vec![full];
        for iterations in (1..full.iterations).rev() {
            ladder.push(QualityLevel { iterations, ..full });
        }
        for substeps in (min_substeps..full.substeps).rev() {
            ladder.push(QualityLevel { substeps, iterations: 1, ..full });
        }
        if full.self_collision {
            ladder.push(QualityLevel {
                substeps: min_substeps,
                iterations: 1,
                self_collision: false,
            });
        }

        Self {
            budget_ms: 8.0,
            enabled: false,
            ladder,
            rung: 0,
            ms_per_unit: None,
            pairs: 0,
        }
    }

    /// Controller whose full quality is the config's current setting.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(QualityLevel::of(config), Self::DEFAULT_MIN_SUBSTEPS)
    }

    pub fn full(&self) -> QualityLevel {
        self.ladder[0]
    }

    /// The recommended level; full quality while disabled.
    pub fn current(&self) -> QualityLevel {
        if self.enabled {
            self.ladder[self.rung]
        } else {
            self.full()
        }
    }

    pub fn ladder(&self) -> &[QualityLevel] {
        &self.ladder
    }

    /// Smoothed milliseconds per work unit, once a step has been measured.
    pub fn ms_per_unit(&self) -> Option<f32> {
        self.ms_per_unit
    }

    /// Predicted frame time at `level` for the scene size seen last.
    pub fn predict_ms(&self, level: &QualityLevel, particles: u32, constraints: u32) -> Option<f32> {
        self.ms_per_unit
            .map(|unit| unit * level.cost_units(particles, constraints, self.pairs))
    }

    /// Feed the statistics of the last step, which ran at `current()`.
    pub fn update(&mut self, stats: &StepStats) {
        if !self.enabled {
            return;
        }

        let ran = QualityLevel {
            substeps: stats.substeps,
            iterations: stats.iterations,
            self_collision: self.current().self_collision,
        };
        if ran.self_collision {
            self.pairs = stats.adjacency_pairs;
        }

        let units = ran.cost_units(stats.particle_count, stats.constraint_count, self.pairs);
        if !(units > 0.0) || !stats.total_ms.is_finite() || stats.total_ms < 0.0 {
            return;
        }
        let sample = stats.total_ms / units;
        let unit = match self.ms_per_unit {
            Some(prev) => prev + (sample - prev) * Self::SMOOTHING,
            None => sample,
        };
        self.ms_per_unit = Some(unit);

        let predict = |level: &QualityLevel| {
            unit * level.cost_units(stats.particle_count, stats.constraint_count, self.pairs)
        };

        let rung = if predict(&self.ladder[self.rung]) > self.budget_ms {
            // Drop to the first cheaper level that fits, or the cheapest one.
            (self.rung + 1..self.ladder.len())
                .find(|&r| predict(&self.ladder[r]) <= self.budget_ms)
                .unwrap_or(self.ladder.len() - 1)
        } else {
            (0..self.rung)
                .find(|&r| predict(&self.ladder[r]) <= self.budget_ms * Self::RAISE_MARGIN)
                .unwrap_or(self.rung)
        };

        if rung != self.rung {
            let level = self.ladder[rung];
            ftlog::debug!(
                "quality {} -> {}: {} substeps x {} iterations, self-collision {} ({:.2} ms predicted)",
                self.rung,
                rung,
                level.substeps,
                level.iterations,
                level.self_collision,
                predict(&level)
            );
            self.rung = rung;
        }
    }

    /// Write the recommended level into `config`.
    pub fn apply_to(&self, config: &mut SimConfig) {
        let level = self.current();
        config.substeps = level.substeps;
        config.solver_iterations = level.iterations;
        config.self_collision = level.self_collision;
    }
}

/// Counters and timing from a single solver step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Wall time of the step in milliseconds.
    pub total_ms: f32,
    pub substeps: u32,
    pub iterations: u32,
    pub particle_count: u32,
    pub constraint_count: u32,
    /// Adjacency pairs found by the last substep's broad phase
    pub adjacency_pairs: u32,
    /// Collision corrections applied over all substeps
    pub contacts: u32,
    /// Particles clamped to the ground over all substeps
    pub ground_contacts: u32,
    /// Constraints and pairs skipped as degenerate
    pub skipped: u32,
    /// Particle map writes dropped by the hash
    pub hash_overflows: u32,
    /// Adjacency pairs dropped for lack of room
    pub adjacency_overflows: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTICLES: u32 = 100;
    const CONSTRAINTS: u32 = 300;
    const PAIRS: u32 = 200;

    fn full() -> QualityLevel {
        QualityLevel { substeps: 10, iterations: 2, self_collision: true }
    }

    fn controller() -> AdaptiveQuality {
        let mut aq = AdaptiveQuality::new(full(), 2);
        aq.enabled = true;
        aq
    }

    /// Stats of a step that ran at `level` and took `ms`.
    fn stats_at(level: QualityLevel, ms: f32) -> StepStats {
        StepStats {
            total_ms: ms,
            substeps: level.substeps,
            iterations: level.iterations,
            particle_count: PARTICLES,
            constraint_count: CONSTRAINTS,
            adjacency_pairs: if level.self_collision { PAIRS } else { 0 },
            ..StepStats::default()
        }
    }

    #[test]
    fn test_ladder_order() {
        let aq = controller();
        let ladder: Vec<_> = aq
            .ladder()
            .iter()
            .map(|l| (l.substeps, l.iterations, l.self_collision))
            .collect();
        assert_eq!(
            ladder,
            vec![
                (10, 2, true),
                (10, 1, true),
                (9, 1, true),
                (8, 1, true),
                (7, 1, true),
                (6, 1, true),
                (5, 1, true),
                (4, 1, true),
                (3, 1, true),
                (2, 1, true),
                (2, 1, false),
            ]
        );
    }

    #[test]
    fn test_disabled_stays_at_full() {
        let mut aq = AdaptiveQuality::new(full(), 2);
        for _ in 0..10 {
            aq.update(&stats_at(full(), 1000.0));
        }
        assert_eq!(aq.current(), full());
        assert!(aq.ms_per_unit().is_none());
    }

    #[test]
    fn test_mild_overload_drops_iterations_first() {
        let mut aq = controller();
        // 10_000 units at full quality, 7_000 with one iteration.
        aq.update(&stats_at(full(), 10.0));
        assert_eq!(
            aq.current(),
            QualityLevel { substeps: 10, iterations: 1, self_collision: true }
        );
    }

    #[test]
    fn test_heavy_overload_drops_substeps_before_collision() {
        let mut aq = controller();
        // 0.0015 ms per unit: (8, 1, true) costs 8.4 ms, (7, 1, true) 7.35 ms.
        aq.update(&stats_at(full(), 15.0));
        let level = aq.current();
        assert!(level.self_collision);
        assert_eq!(level.iterations, 1);
        assert_eq!(level.substeps, 7);
    }

    #[test]
    fn test_extreme_overload_disables_self_collision() {
        let mut aq = controller();
        aq.update(&stats_at(full(), 1000.0));
        assert_eq!(
            aq.current(),
            QualityLevel { substeps: 2, iterations: 1, self_collision: false }
        );
    }

    #[test]
    fn test_near_budget_level_is_kept() {
        let mut aq = controller();
        aq.update(&stats_at(full(), 10.0));
        let level = aq.current();
        // Same unit cost: full quality predicts 10 ms, above the raise margin.
        for _ in 0..20 {
            aq.update(&stats_at(level, 7.0));
        }
        assert_eq!(aq.current(), level);
    }

    #[test]
    fn test_cheap_steps_restore_full_quality() {
        let mut aq = controller();
        aq.update(&stats_at(full(), 1000.0));
        assert!(!aq.current().self_collision);

        for _ in 0..40 {
            let level = aq.current();
            aq.update(&stats_at(level, 0.1));
        }

        assert_eq!(aq.current(), full());
    }

    #[test]
    fn test_ignores_empty_steps() {
        let mut aq = controller();
        aq.update(&StepStats::default());
        assert!(aq.ms_per_unit().is_none());
        assert_eq!(aq.current(), full());
    }

    #[test]
    fn test_apply_to_config() {
        let mut config = SimConfig { solver_iterations: 3, ..SimConfig::default() };
        let mut aq = AdaptiveQuality::from_config(&config);
        aq.enabled = true;
        aq.update(&StepStats {
            total_ms: 500.0,
            substeps: config.substeps,
            iterations: config.solver_iterations,
            particle_count: PARTICLES,
            constraint_count: CONSTRAINTS,
            adjacency_pairs: PAIRS,
            ..StepStats::default()
        });
        aq.apply_to(&mut config);
        assert_eq!(config.substeps, AdaptiveQuality::DEFAULT_MIN_SUBSTEPS);
        assert_eq!(config.solver_iterations, 1);
        assert!(!config.self_collision);
    }
}
