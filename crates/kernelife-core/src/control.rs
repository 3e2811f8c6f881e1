//! Commands that mutate a simulation between ticks.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::SimulationError;
use crate::display::DisplayMode;
use crate::rule::{RuleKnob, RuleParams};
use crate::simulation::{BrushStroke, Simulation};

/// A single edit applied at a tick boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    SetRule { knob: RuleKnob, value: f32 },
    NudgeRule { knob: RuleKnob, delta: f32 },
    ReplaceRules { params: RuleParams },
    SetDisplayMode { mode: DisplayMode },
    CycleDisplayMode { step: i32 },
    Brush { stroke: BrushStroke },
    Randomize { density: f32 },
    Clear,
    SetKernelActive { slot: usize, active: bool },
    SetKernelGain { slot: usize, gain: f32 },
    EditKernelWeight { slot: usize, x: usize, y: usize, value: f32 },
}

/// Apply `command` to `simulation` and the caller-owned `rules`.
///
/// Failed commands leave both untouched.
pub fn apply_control_command(
    simulation: &mut Simulation,
    rules: &mut RuleParams,
    command: ControlCommand,
) -> Result<(), SimulationError> {
    match command {
        ControlCommand::SetRule { knob, value } => {
            rules.set(knob, value)?;
            log_rules(rules);
        }
        ControlCommand::NudgeRule { knob, delta } => {
            rules.nudge(knob, delta)?;
            log_rules(rules);
        }
        ControlCommand::ReplaceRules { params } => {
            params.validate()?;
            *rules = params;
            log_rules(rules);
        }
        ControlCommand::SetDisplayMode { mode } => simulation.set_display_mode(mode),
        ControlCommand::CycleDisplayMode { step } => {
            let mode = simulation.cycle_display_mode(step);
            info!(display = %mode, "display mode");
        }
        ControlCommand::Brush { stroke } => {
            simulation.apply_stroke(stroke);
        }
        ControlCommand::Randomize { density } => simulation.randomize(density),
        ControlCommand::Clear => simulation.clear(),
        ControlCommand::SetKernelActive { slot, active } => {
            simulation.bank_mut().set_active(slot, active)?;
            debug!(slot, active, "kernel activity changed");
        }
        ControlCommand::SetKernelGain { slot, gain } => {
            simulation.bank_mut().set_gain(slot, gain)?;
            debug!(slot, gain, "kernel gain changed");
        }
        ControlCommand::EditKernelWeight { slot, x, y, value } => {
            simulation.bank_mut().set_weight(slot, x, y, value)?;
        }
    }
    Ok(())
}

fn log_rules(rules: &RuleParams) {
    info!(
        dead_min = rules.dead_min,
        pop_max = rules.pop_max,
        birth_min = rules.birth_min,
        life_min = rules.life_min,
        "rule parameters"
    );
}
