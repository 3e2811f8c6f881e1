//! Summary of a headless run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use kernelife_core::{DisplayMode, RuleParams, StepReport, Tick};
use serde::{Deserialize, Serialize};

/// Min/mean/max of a per-tick scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub min: f32,
    pub mean: f32,
    pub max: f32,
}

/// Accumulates step reports into a [`HeadlessReport`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    ticks: u64,
    live_min: f32,
    live_max: f32,
    live_sum: f64,
    last: Option<StepReport>,
    commands_applied: usize,
}

impl RunSummary {
    pub fn record(&mut self, report: &StepReport) {
        let live = report.live_fraction;
        if self.ticks == 0 {
            self.live_min = live;
            self.live_max = live;
        } else {
            self.live_min = self.live_min.min(live);
            self.live_max = self.live_max.max(live);
        }
        self.live_sum += f64::from(live);
        self.ticks += 1;
        self.last = Some(*report);
    }

    pub fn add_commands(&mut self, applied: usize) {
        self.commands_applied += applied;
    }

    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn finish(&self, rules: RuleParams, display_mode: DisplayMode) -> HeadlessReport {
        let last = self.last;
        HeadlessReport {
            ticks: self.ticks,
            final_tick: last.map_or(Tick::zero(), |report| report.tick),
            elapsed: last.map_or(0.0, |report| report.elapsed),
            final_derivative: last.map_or(0.0, |report| report.derivative),
            final_smoothed_derivative: last.map_or(0.0, |report| report.smoothed_derivative),
            live_fraction: (self.ticks > 0).then(|| Spread {
                min: self.live_min,
                mean: (self.live_sum / self.ticks as f64) as f32,
                max: self.live_max,
            }),
            commands_applied: self.commands_applied,
            rules,
            display_mode,
        }
    }
}

/// JSON document written at the end of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlessReport {
    pub ticks: u64,
    pub final_tick: Tick,
    pub elapsed: f64,
    pub final_derivative: f32,
    pub final_smoothed_derivative: f32,
    pub live_fraction: Option<Spread>,
    pub commands_applied: usize,
    pub rules: RuleParams,
    pub display_mode: DisplayMode,
}

impl HeadlessReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self).context("failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
