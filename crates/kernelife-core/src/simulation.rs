//! Double-buffered lattice state and the per-tick stepping loop.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bank::{KernelBank, KernelSlot, KernelSlotConfig};
use crate::convolution::{Convolver, LatticeSpectrum};
use crate::display::{self, DisplayMode};
use crate::lattice::Lattice;
use crate::metrics::{MetricSample, MetricSeries, MetricSource, MetricTracker};
use crate::rule::{RuleEvaluator, RuleMode, RuleParams};
use crate::{SimulationError, Tick};

/// Static configuration for a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Lattice width in cells.
    pub width: usize,
    /// Lattice height in cells.
    pub height: usize,
    /// Optional seed for the random initial state and `randomize`.
    pub rng_seed: Option<u64>,
    /// Probability that a cell starts alive.
    pub seed_density: f32,
    /// Kernels combined into the density seen by the rule.
    pub kernels: Vec<KernelSlotConfig>,
    pub rule_mode: RuleMode,
    /// Fraction of the way each cell moves towards the rule output per tick.
    pub update_rate: f32,
    pub display_mode: DisplayMode,
    /// Weight of the previous display frame when blending in a new one.
    pub display_persistence: f32,
    /// Length of each metric series.
    pub metric_history: usize,
    /// Standard deviation of the smoothed-derivative blur, in cells.
    pub derivative_blur_sigma: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            rng_seed: None,
            seed_density: 0.5,
            kernels: vec![KernelSlotConfig::default()],
            rule_mode: RuleMode::Binary,
            update_rate: 1.0,
            display_mode: DisplayMode::Raw,
            display_persistence: 0.0,
            metric_history: 100,
            derivative_blur_sigma: 6.0,
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration, returning the lattice dimensions.
    pub fn validate(&self) -> Result<(usize, usize), SimulationError> {
        if self.width == 0 || self.height == 0 {
            return Err(SimulationError::InvalidConfig(
                "lattice dimensions must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.seed_density) {
            return Err(SimulationError::InvalidConfig(
                "seed_density must be within [0, 1]",
            ));
        }
        if !(0.0..1.0).contains(&self.display_persistence) {
            return Err(SimulationError::InvalidConfig(
                "display_persistence must be within [0, 1)",
            ));
        }
        if self.metric_history == 0 {
            return Err(SimulationError::InvalidConfig(
                "metric_history must be non-zero",
            ));
        }
        if !(self.derivative_blur_sigma.is_finite() && self.derivative_blur_sigma > 0.0) {
            return Err(SimulationError::InvalidConfig(
                "derivative_blur_sigma must be positive",
            ));
        }
        Ok((self.width, self.height))
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Lifecycle of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SimulationPhase {
    /// Constructed, no tick processed yet.
    #[default]
    Idle,
    Running,
}

/// Value a brush stroke writes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrushMode {
    Paint,
    Erase,
    /// Explicit value, clamped to `[0, 1]`.
    Value(f32),
}

impl BrushMode {
    #[must_use]
    pub fn value(self) -> f32 {
        match self {
            Self::Paint => 1.0,
            Self::Erase => 0.0,
            Self::Value(value) if value.is_nan() => 0.0,
            Self::Value(value) => value.clamp(0.0, 1.0),
        }
    }
}

/// Square brush edit in normalized lattice coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushStroke {
    pub x: f32,
    pub y: f32,
    pub size: usize,
    pub mode: BrushMode,
}

/// Summary of a processed tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub tick: Tick,
    pub elapsed: f64,
    pub derivative: f32,
    pub smoothed_derivative: f32,
    /// Mean cell value of the new generation.
    pub live_fraction: f32,
}

/// Lattice, kernels and bookkeeping for one continuous automaton.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    convolver: Convolver,
    bank: KernelBank,
    evaluator: RuleEvaluator,
    metrics: MetricTracker,
    current: Lattice,
    scratch: Lattice,
    density: Lattice,
    display: Lattice,
    display_mode: DisplayMode,
    /// Set on a mode change so the next frame replaces the display outright.
    display_stale: bool,
    rng: SmallRng,
    tick: Tick,
    elapsed: f64,
    phase: SimulationPhase,
}

impl Simulation {
    /// Build a simulation and seed its lattice randomly.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let (width, height) = config.validate()?;
        let convolver = Convolver::new(width, height);
        let bank = KernelBank::from_configs(convolver.clone(), &config.kernels)?;
        let evaluator = RuleEvaluator::new(config.rule_mode, config.update_rate)?;
        let metrics =
            MetricTracker::new(&convolver, config.metric_history, config.derivative_blur_sigma)?;
        let rng = config.seeded_rng();
        let blank = Lattice::new(width, height, 0.0)?;
        let seed_density = config.seed_density;

        let mut simulation = Self {
            display_mode: config.display_mode,
            display_stale: true,
            convolver,
            bank,
            evaluator,
            metrics,
            current: blank.clone(),
            scratch: blank.clone(),
            density: blank.clone(),
            display: blank,
            rng,
            tick: Tick::zero(),
            elapsed: 0.0,
            phase: SimulationPhase::Idle,
            config,
        };
        simulation.randomize(seed_density);
        debug!(
            width,
            height,
            kernels = simulation.bank.len(),
            seed = ?simulation.config.rng_seed,
            "simulation initialised"
        );
        Ok(simulation)
    }

    /// Advance one generation under `rules`; `dt` only advances the clock.
    pub fn step(&mut self, rules: &RuleParams, dt: f32) -> StepReport {
        let spectrum = self.convolver.transform(&self.current);
        self.stage_density(&spectrum);
        self.stage_rule(rules);
        let sample = self.stage_metrics();
        self.stage_display();
        std::mem::swap(&mut self.current, &mut self.scratch);

        self.tick = self.tick.next();
        self.elapsed += f64::from(dt);
        self.phase = SimulationPhase::Running;
        let report = StepReport {
            tick: self.tick,
            elapsed: self.elapsed,
            derivative: sample.derivative,
            smoothed_derivative: sample.smoothed,
            live_fraction: self.current.mean(),
        };
        trace!(
            tick = report.tick.0,
            derivative = report.derivative,
            live = report.live_fraction,
            "tick processed"
        );
        report
    }

    /// Combined `sum(gain * density)` over active kernels.
    fn stage_density(&mut self, spectrum: &LatticeSpectrum) {
        let active: Vec<&KernelSlot> = self.bank.active_slots().collect();
        let convolver = &self.convolver;
        let densities: Vec<(f32, Vec<f32>)> = active
            .par_iter()
            .map(|slot| {
                (
                    slot.gain(),
                    convolver.density_spectrum(spectrum, slot.spectrum()),
                )
            })
            .collect();

        let combined = self.density.cells_mut();
        match densities.as_slice() {
            [(gain, single)] if *gain == 1.0 => combined.copy_from_slice(single),
            _ => {
                combined.fill(0.0);
                for (gain, map) in &densities {
                    for (out, &value) in combined.iter_mut().zip(map) {
                        *out += gain * value;
                    }
                }
            }
        }
    }

    fn stage_rule(&mut self, rules: &RuleParams) {
        self.evaluator.apply(
            rules,
            self.density.cells(),
            self.current.cells(),
            self.scratch.cells_mut(),
        );
    }

    fn stage_metrics(&mut self) -> MetricSample {
        self.metrics
            .record(&self.convolver, &self.scratch, &self.current)
    }

    /// Every mode shows the generation just computed into `scratch`.
    fn stage_display(&mut self) {
        let persistence = if self.display_stale {
            0.0
        } else {
            self.config.display_persistence
        };
        self.display_stale = false;
        let display = self.display.cells_mut();
        match self.display_mode {
            DisplayMode::Raw => display::blend_into(display, self.scratch.cells(), persistence),
            DisplayMode::Fourier => {
                let spectrum = self.convolver.transform(&self.scratch);
                let mut frame = vec![0.0; display.len()];
                display::spectrum_view(&spectrum, &mut frame);
                display::blend_into(display, &frame, persistence);
            }
            DisplayMode::Derivative => display::blend_into(
                display,
                self.metrics.derivative_field().cells(),
                persistence,
            ),
            DisplayMode::SmoothedDerivative => display::blend_into(
                display,
                self.metrics.smoothed_field().cells(),
                persistence,
            ),
        }
    }

    /// Write a `size x size` square centered on the normalized point.
    ///
    /// The square is clipped at the lattice edges and never wraps. Returns the
    /// number of cells written.
    pub fn apply_brush(&mut self, x_norm: f32, y_norm: f32, size: usize, mode: BrushMode) -> usize {
        let (width, height) = (self.current.width(), self.current.height());
        let to_cell = |norm: f32, extent: usize| -> isize {
            let norm = if norm.is_nan() { 0.0 } else { norm };
            ((norm * extent as f32).floor() as isize).clamp(0, extent as isize - 1)
        };
        let (cx, cy) = (to_cell(x_norm, width), to_cell(y_norm, height));
        // Anything wider than twice the lattice covers it from any center.
        let size = size.min(width.max(height).saturating_mul(2).saturating_add(1));
        let half = (size / 2) as isize;
        let (x0, y0) = (cx - half, cy - half);
        let written = self.current.fill_region(
            x0,
            y0,
            x0 + size as isize,
            y0 + size as isize,
            mode.value(),
        );
        debug!(x = cx, y = cy, size, ?mode, written, "brush applied");
        written
    }

    pub fn apply_stroke(&mut self, stroke: BrushStroke) -> usize {
        self.apply_brush(stroke.x, stroke.y, stroke.size, stroke.mode)
    }

    /// Reseed every cell to 1.0 with probability `density`, else 0.0.
    pub fn randomize(&mut self, density: f32) {
        let density = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
        let rng = &mut self.rng;
        for cell in self.current.cells_mut() {
            *cell = if rng.random::<f32>() < density { 1.0 } else { 0.0 };
        }
        debug!(density, live = self.current.mean(), "lattice randomized");
    }

    pub fn clear(&mut self) {
        self.current.fill(0.0);
        debug!("lattice cleared");
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if self.display_mode != mode {
            debug!(from = %self.display_mode, to = %mode, "display mode changed");
            self.display_stale = true;
        }
        self.display_mode = mode;
    }

    /// Move through the display modes by `step` and return the new mode.
    pub fn cycle_display_mode(&mut self, step: i32) -> DisplayMode {
        self.set_display_mode(self.display_mode.cycle(step));
        self.display_mode
    }

    #[must_use]
    pub const fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current generation.
    #[must_use]
    pub const fn lattice(&self) -> &Lattice {
        &self.current
    }

    /// Mutable access to one cell of the current generation, for edits between ticks.
    #[must_use]
    pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut f32> {
        self.current.get_mut(x, y)
    }

    /// Row-major cells of the current generation; the lattice shape stays fixed.
    #[must_use]
    pub fn cells_mut(&mut self) -> &mut [f32] {
        self.current.cells_mut()
    }

    #[must_use]
    pub const fn display(&self) -> &Lattice {
        &self.display
    }

    /// Combined density fed to the rule on the last tick.
    #[must_use]
    pub const fn density(&self) -> &Lattice {
        &self.density
    }

    #[must_use]
    pub fn series(&self, source: MetricSource) -> &MetricSeries {
        self.metrics.series(source)
    }

    #[must_use]
    pub const fn metrics(&self) -> &MetricTracker {
        &self.metrics
    }

    #[must_use]
    pub const fn bank(&self) -> &KernelBank {
        &self.bank
    }

    #[must_use]
    pub fn bank_mut(&mut self) -> &mut KernelBank {
        &mut self.bank
    }

    #[must_use]
    pub const fn convolver(&self) -> &Convolver {
        &self.convolver
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn phase(&self) -> SimulationPhase {
        self.phase
    }

    /// Sum of every `dt` passed to [`Self::step`].
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelShape;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            width: 32,
            height: 24,
            rng_seed: Some(42),
            kernels: vec![KernelSlotConfig::from(KernelShape::Ring {
                size: 9,
                radius: 2.0,
                sigma: 4.0,
            })],
            derivative_blur_sigma: 1.5,
            metric_history: 16,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let mut config = small_config();
        config.width = 0;
        assert!(config.validate().is_err());
        let mut config = small_config();
        config.display_persistence = 1.0;
        assert!(config.validate().is_err());
        let mut config = small_config();
        config.seed_density = 1.5;
        assert!(Simulation::new(config).is_err());
        let mut config = small_config();
        config.kernels = vec![KernelSlotConfig::from(KernelShape::Moore { size: 25 })];
        assert!(matches!(
            Simulation::new(config),
            Err(SimulationError::Kernel(_))
        ));
    }

    #[test]
    fn step_advances_clock_and_phase() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        assert_eq!(sim.phase(), SimulationPhase::Idle);
        assert_eq!(sim.tick(), Tick::zero());
        let rules = RuleParams::default();
        sim.step(&rules, 0.5);
        let report = sim.step(&rules, 0.25);
        assert_eq!(report.tick, Tick(2));
        assert_eq!(sim.phase(), SimulationPhase::Running);
        assert!((sim.elapsed() - 0.75).abs() < 1e-9);
        assert!(report.derivative >= 0.0);
        assert!((0.0..=1.0).contains(&report.live_fraction));
        assert_eq!(sim.series(MetricSource::Derivative).len(), 16);
    }

    #[test]
    fn raw_display_shows_new_generation() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        sim.step(&RuleParams::default(), 1.0);
        assert_eq!(sim.display().cells(), sim.lattice().cells());
    }

    #[test]
    fn inactive_kernels_are_skipped() {
        let mut config = small_config();
        config.kernels[0].active = false;
        let mut sim = Simulation::new(config).expect("simulation");
        sim.step(&RuleParams::default(), 1.0);
        assert!(sim.density().cells().iter().all(|&d| d == 0.0));
        assert!(sim.lattice().cells().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn gains_scale_combined_density() {
        let mut config = small_config();
        config.seed_density = 1.0;
        config.kernels = vec![
            KernelSlotConfig {
                shape: KernelShape::Moore { size: 3 },
                gain: 0.25,
                active: true,
            },
            KernelSlotConfig {
                shape: KernelShape::Moore { size: 5 },
                gain: 0.5,
                active: true,
            },
        ];
        let mut sim = Simulation::new(config).expect("simulation");
        sim.step(&RuleParams::default(), 1.0);
        assert!(
            sim.density()
                .cells()
                .iter()
                .all(|&d| (d - 0.75).abs() < 1e-4)
        );
    }

    #[test]
    fn randomize_and_clear() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        sim.randomize(1.0);
        assert!(sim.lattice().cells().iter().all(|&c| c == 1.0));
        sim.randomize(0.0);
        assert!(sim.lattice().cells().iter().all(|&c| c == 0.0));
        sim.randomize(0.5);
        let live = sim.lattice().mean();
        assert!(live > 0.3 && live < 0.7, "live fraction {live}");
        sim.clear();
        assert_eq!(sim.lattice().sum(), 0.0);
    }

    #[test]
    fn oversized_brush_clips_to_whole_lattice() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        sim.clear();
        let cells = 32 * 24;
        assert_eq!(sim.apply_brush(0.5, 0.5, usize::MAX, BrushMode::Paint), cells);
        assert_eq!(sim.lattice().sum(), cells as f64);
        assert_eq!(sim.apply_brush(0.0, 1.0, 1 << 63, BrushMode::Erase), cells);
        assert_eq!(sim.lattice().sum(), 0.0);
    }

    #[test]
    fn cell_edits_keep_lattice_shape() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        sim.clear();
        *sim.cell_mut(3, 4).expect("cell") = 1.0;
        assert!(sim.cell_mut(32, 0).is_none());
        sim.cells_mut()[0] = 0.5;
        assert_eq!(sim.lattice().get(3, 4), Some(1.0));
        assert_eq!(sim.lattice().get(0, 0), Some(0.5));
        sim.step(&RuleParams::default(), 1.0);
        assert_eq!(
            (sim.lattice().width(), sim.lattice().height()),
            (32, 24)
        );
    }

    #[test]
    fn fourier_display_tracks_new_generation() {
        let mut config = small_config();
        config.display_mode = DisplayMode::Fourier;
        let mut sim = Simulation::new(config).expect("simulation");
        sim.step(&RuleParams::default(), 1.0);
        let spectrum = sim.convolver().transform(sim.lattice());
        let mut expected = vec![0.0; 32 * 24];
        display::spectrum_view(&spectrum, &mut expected);
        assert_eq!(sim.display().cells(), expected.as_slice());
    }

    #[test]
    fn mode_switch_replaces_persisted_frame() {
        let mut config = small_config();
        config.display_persistence = 0.7;
        config.display_mode = DisplayMode::Fourier;
        let mut sim = Simulation::new(config).expect("simulation");
        sim.step(&RuleParams::default(), 1.0);
        sim.set_display_mode(DisplayMode::Raw);
        sim.step(&RuleParams::default(), 1.0);
        assert_eq!(sim.display().cells(), sim.lattice().cells());
    }

    #[test]
    fn display_mode_cycles() {
        let mut sim = Simulation::new(small_config()).expect("simulation");
        assert_eq!(sim.cycle_display_mode(1), DisplayMode::Fourier);
        sim.step(&RuleParams::default(), 1.0);
        assert!(sim.display().max() <= 1.0 + 1e-6);
        assert_eq!(sim.cycle_display_mode(-2), DisplayMode::SmoothedDerivative);
    }
}
