//! Threshold rule deriving the next generation from neighborhood density.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SimulationError;

/// The four thresholds of the density rule.
///
/// A cell is alive next tick when its density stays under `pop_max` and
/// either exceeds `birth_min`, or exceeds `dead_min` while the cell itself is
/// above `life_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParams {
    #[serde(alias = "deadMin")]
    pub dead_min: f32,
    #[serde(alias = "popMax")]
    pub pop_max: f32,
    #[serde(alias = "birthMin")]
    pub birth_min: f32,
    #[serde(alias = "lifeMin")]
    pub life_min: f32,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            dead_min: 0.15,
            pop_max: 0.5,
            birth_min: 0.4,
            life_min: 0.5,
        }
    }
}

/// Names one of the [`RuleParams`] thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKnob {
    DeadMin,
    PopMax,
    BirthMin,
    LifeMin,
}

impl RuleKnob {
    pub const ALL: [Self; 4] = [Self::DeadMin, Self::PopMax, Self::BirthMin, Self::LifeMin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeadMin => "dead_min",
            Self::PopMax => "pop_max",
            Self::BirthMin => "birth_min",
            Self::LifeMin => "life_min",
        }
    }
}

impl fmt::Display for RuleKnob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown rule parameter `{0}`")]
pub struct UnknownKnob(pub String);

impl FromStr for RuleKnob {
    type Err = UnknownKnob;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dead_min" | "deadMin" => Ok(Self::DeadMin),
            "pop_max" | "popMax" => Ok(Self::PopMax),
            "birth_min" | "birthMin" => Ok(Self::BirthMin),
            "life_min" | "lifeMin" => Ok(Self::LifeMin),
            other => Err(UnknownKnob(other.to_owned())),
        }
    }
}

impl RuleParams {
    #[must_use]
    pub const fn get(&self, knob: RuleKnob) -> f32 {
        match knob {
            RuleKnob::DeadMin => self.dead_min,
            RuleKnob::PopMax => self.pop_max,
            RuleKnob::BirthMin => self.birth_min,
            RuleKnob::LifeMin => self.life_min,
        }
    }

    fn slot(&mut self, knob: RuleKnob) -> &mut f32 {
        match knob {
            RuleKnob::DeadMin => &mut self.dead_min,
            RuleKnob::PopMax => &mut self.pop_max,
            RuleKnob::BirthMin => &mut self.birth_min,
            RuleKnob::LifeMin => &mut self.life_min,
        }
    }

    /// Overwrite a threshold. Non-finite values are rejected.
    pub fn set(&mut self, knob: RuleKnob, value: f32) -> Result<(), SimulationError> {
        if !value.is_finite() {
            return Err(SimulationError::InvalidConfig(
                "rule parameters must be finite",
            ));
        }
        *self.slot(knob) = value;
        Ok(())
    }

    /// Shift a threshold by `delta`, returning the new value.
    pub fn nudge(&mut self, knob: RuleKnob, delta: f32) -> Result<f32, SimulationError> {
        let value = self.get(knob) + delta;
        self.set(knob, value)?;
        Ok(value)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if RuleKnob::ALL.iter().all(|&knob| self.get(knob).is_finite()) {
            Ok(())
        } else {
            Err(SimulationError::InvalidConfig(
                "rule parameters must be finite",
            ))
        }
    }

    /// Binary rule for one cell. Comparisons are strict, so ties yield "dead".
    #[inline]
    #[must_use]
    pub fn evaluate(&self, density: f32, previous: f32) -> bool {
        density < self.pop_max
            && (density > self.birth_min
                || (density > self.dead_min && previous > self.life_min))
    }

    /// Smooth counterpart of [`Self::evaluate`] using logistic steps.
    #[inline]
    #[must_use]
    pub fn evaluate_smooth(&self, density: f32, previous: f32, sharpness: f32) -> f32 {
        let above = |value: f32, threshold: f32| logistic(sharpness * (value - threshold));
        let under_crowding = above(self.pop_max, density);
        let birth = above(density, self.birth_min);
        let survival = above(density, self.dead_min) * above(previous, self.life_min);
        under_crowding * (birth + survival - birth * survival)
    }
}

#[inline]
fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// How the rule output is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleMode {
    /// Hard thresholds producing 0.0 / 1.0.
    #[default]
    Binary,
    /// Logistic thresholds producing values in (0, 1).
    Continuous { sharpness: f32 },
}

/// Applies the rule cellwise from one snapshot into another buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleEvaluator {
    mode: RuleMode,
    update_rate: f32,
}

impl RuleEvaluator {
    pub fn new(mode: RuleMode, update_rate: f32) -> Result<Self, SimulationError> {
        if let RuleMode::Continuous { sharpness } = mode
            && !(sharpness.is_finite() && sharpness > 0.0)
        {
            return Err(SimulationError::InvalidConfig(
                "continuous rule sharpness must be positive",
            ));
        }
        if !(update_rate > 0.0 && update_rate <= 1.0) {
            return Err(SimulationError::InvalidConfig(
                "update_rate must be in (0, 1]",
            ));
        }
        Ok(Self { mode, update_rate })
    }

    #[must_use]
    pub const fn mode(&self) -> RuleMode {
        self.mode
    }

    #[must_use]
    pub const fn update_rate(&self) -> f32 {
        self.update_rate
    }

    /// Rule output for a single cell, before blending with the previous value.
    #[inline]
    #[must_use]
    pub fn target(&self, params: &RuleParams, density: f32, previous: f32) -> f32 {
        match self.mode {
            RuleMode::Binary => {
                if params.evaluate(density, previous) {
                    1.0
                } else {
                    0.0
                }
            }
            RuleMode::Continuous { sharpness } => {
                params.evaluate_smooth(density, previous, sharpness)
            }
        }
    }

    /// Fill `next` from `density` and `previous`; each cell only reads its own inputs.
    pub fn apply(&self, params: &RuleParams, density: &[f32], previous: &[f32], next: &mut [f32]) {
        debug_assert_eq!(density.len(), previous.len());
        debug_assert_eq!(density.len(), next.len());
        let rate = self.update_rate;
        next.par_iter_mut()
            .zip(density.par_iter().zip(previous.par_iter()))
            .for_each(|(out, (&d, &s))| {
                let target = self.target(params, d, s);
                *out = if rate >= 1.0 { target } else { s + rate * (target - s) };
            });
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self {
            mode: RuleMode::Binary,
            update_rate: 1.0,
        }
    }
}
