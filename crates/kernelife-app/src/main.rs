use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use kernelife_app::command::{create_command_bus, make_command_drain};
use kernelife_app::{
    ControlHandle, RunConfig, RunSummary, ScriptPlayer, SimulationSession, parse_script,
};
use kernelife_core::{DisplayMode, KernelShape, KernelSlotConfig, MetricSource};
use tracing::{debug, info, warn};

const COMMAND_QUEUE_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(
    name = "kernelife",
    version,
    about = "Run a continuous Game of Life variant headlessly"
)]
struct Cli {
    /// JSON file with `simulation` and `rules` sections.
    #[arg(long, env = "KERNELIFE_CONFIG")]
    config: Option<PathBuf>,
    /// Lattice width in cells.
    #[arg(long)]
    width: Option<usize>,
    /// Lattice height in cells.
    #[arg(long)]
    height: Option<usize>,
    /// Seed for the initial lattice.
    #[arg(long, env = "KERNELIFE_SEED")]
    seed: Option<u64>,
    /// Number of ticks to simulate.
    #[arg(long, env = "KERNELIFE_TICKS", default_value_t = 200)]
    ticks: u64,
    /// Seconds added to the simulation clock per tick.
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,
    /// Replace the configured kernels with a single preset.
    #[arg(long, value_enum)]
    preset: Option<Preset>,
    /// Initial display mode (raw, fourier, derivative, smoothed-derivative).
    #[arg(long)]
    display: Option<DisplayMode>,
    /// Key script replayed through the key map, one key per line.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Write a JSON run report to this path.
    #[arg(long, env = "KERNELIFE_REPORT")]
    report: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    Ring,
    Gaussian,
    Checkerboard,
    CosineRing,
    Moore,
}

impl Preset {
    fn shape(self) -> KernelShape {
        match self {
            Self::Ring => KernelShape::default(),
            Self::Gaussian => KernelShape::Gaussian {
                size: 33,
                mu: None,
                sigma: 64.0,
            },
            Self::Checkerboard => KernelShape::Checkerboard {
                size: 15,
                blur_sigma: 1.0,
            },
            Self::CosineRing => KernelShape::CosineRing {
                size: 33,
                frequency: 0.03,
            },
            Self::Moore => KernelShape::Moore { size: 3 },
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let simulation = &mut config.simulation;
    if let Some(width) = cli.width {
        simulation.width = width;
    }
    if let Some(height) = cli.height {
        simulation.height = height;
    }
    if cli.seed.is_some() {
        simulation.rng_seed = cli.seed;
    }
    if let Some(preset) = cli.preset {
        simulation.kernels = vec![KernelSlotConfig::from(preset.shape())];
    }
    if let Some(display) = cli.display {
        simulation.display_mode = display;
    }
    Ok(config)
}

fn load_script(path: Option<&PathBuf>) -> Result<ScriptPlayer> {
    let steps = match path {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            parse_script(&source).with_context(|| format!("invalid script {}", path.display()))?
        }
        None => Vec::new(),
    };
    Ok(ScriptPlayer::new(steps))
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let mut player = load_script(cli.script.as_ref())?;
    let session = SimulationSession::new(config.simulation, config.rules)
        .context("invalid simulation configuration")?
        .into_shared();
    let (sender, receiver) = create_command_bus(COMMAND_QUEUE_CAPACITY);
    let handle = ControlHandle::new(Arc::clone(&session), sender);
    let drain = make_command_drain(receiver);

    info!(ticks = cli.ticks, "Starting Kernelife headless run");
    let mut summary = RunSummary::default();
    for _ in 0..cli.ticks {
        for key in player.keys_for_tick() {
            if let Err(err) = handle.press_key(key) {
                warn!(%key, %err, "script key ignored");
            }
        }
        let mut guard = session
            .lock()
            .map_err(|_| anyhow!("simulation session lock poisoned"))?;
        summary.add_commands(drain(&mut *guard));
        let report = guard.step(cli.dt);
        summary.record(&report);
        debug!(
            tick = report.tick.0,
            derivative = report.derivative,
            smoothed = report.smoothed_derivative,
            live = report.live_fraction,
            "tick"
        );
    }

    let guard = session
        .lock()
        .map_err(|_| anyhow!("simulation session lock poisoned"))?;
    let report = summary.finish(guard.rules, guard.simulation.display_mode());
    let peak_derivative = guard.simulation.series(MetricSource::Derivative).max();
    drop(guard);

    info!(
        ticks = report.ticks,
        final_tick = report.final_tick.0,
        derivative = report.final_derivative,
        smoothed = report.final_smoothed_derivative,
        peak_derivative,
        live_mean = report.live_fraction.map(|spread| spread.mean),
        commands = report.commands_applied,
        "Kernelife headless run completed"
    );
    if let Some(path) = &cli.report {
        report.write_json(path)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}
