//! Shared application plumbing for Kernelife drivers.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use kernelife_core::{
    ControlCommand, RuleParams, Simulation, SimulationConfig, SimulationError, StepReport,
    apply_control_command,
};

pub mod command;
pub mod control;
pub mod keymap;
pub mod report;

pub use control::{ControlError, ControlHandle, SessionSnapshot};
pub use keymap::{KeyMap, ScriptError, ScriptPlayer, ScriptStep, parse_script};
pub use report::{HeadlessReport, RunSummary};

/// Contents of a `--config` file: simulation settings plus starting rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub rules: RuleParams,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

pub type SharedSession = Arc<Mutex<SimulationSession>>;

/// A simulation together with the rule parameters driving it.
#[derive(Debug)]
pub struct SimulationSession {
    pub simulation: Simulation,
    pub rules: RuleParams,
}

impl SimulationSession {
    pub fn new(config: SimulationConfig, rules: RuleParams) -> Result<Self, SimulationError> {
        rules.validate()?;
        Ok(Self {
            simulation: Simulation::new(config)?,
            rules,
        })
    }

    pub fn step(&mut self, dt: f32) -> StepReport {
        self.simulation.step(&self.rules, dt)
    }

    pub fn apply(&mut self, command: ControlCommand) -> Result<(), SimulationError> {
        apply_control_command(&mut self.simulation, &mut self.rules, command)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.simulation.tick(),
            elapsed: self.simulation.elapsed(),
            rules: self.rules,
            display_mode: self.simulation.display_mode(),
            live_fraction: self.simulation.lattice().mean(),
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }
}
