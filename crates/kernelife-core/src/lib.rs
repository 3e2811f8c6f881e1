//! Core types for the Kernelife continuous cellular automaton.
//!
//! A [`Simulation`] owns a double-buffered [`Lattice`] and a [`KernelBank`].
//! Every tick it convolves the lattice with each active kernel through
//! FFTs, feeds the normalized neighborhood density to the threshold rule and
//! records how much the lattice changed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bank;
pub mod control;
pub mod convolution;
pub mod display;
pub mod kernel;
pub mod lattice;
pub mod metrics;
pub mod rule;
pub mod simulation;

pub use bank::{KernelBank, KernelSlot, KernelSlotConfig};
pub use control::{ControlCommand, apply_control_command};
pub use convolution::{Convolver, KernelSpectrum, LatticeSpectrum};
pub use display::{DisplayMode, ParseDisplayModeError};
pub use kernel::{Kernel, KernelError, KernelShape};
pub use lattice::Lattice;
pub use metrics::{MetricSample, MetricSeries, MetricSource, MetricTracker};
pub use rule::{RuleEvaluator, RuleKnob, RuleMode, RuleParams, UnknownKnob};
pub use simulation::{
    BrushMode, BrushStroke, Simulation, SimulationConfig, SimulationPhase, StepReport,
};

/// High level simulation clock (ticks processed since construction).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Errors that can occur when constructing or editing a simulation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A kernel could not be built, fitted or edited.
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counts_up_from_zero() {
        let tick = Tick::zero();
        assert_eq!(tick.next().next(), Tick(2));
        assert!(Tick(3) > Tick(1));
    }

    #[test]
    fn kernel_errors_convert() {
        let err: SimulationError = KernelError::EvenSize(4).into();
        assert_eq!(err.to_string(), "kernel size 4 must be odd and non-zero");
    }
}
