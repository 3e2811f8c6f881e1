//! Display buffer modes and the spectrum view.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convolution::LatticeSpectrum;

/// What the display buffer shows after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// The newly computed generation.
    #[default]
    Raw,
    /// Log-magnitude of the lattice spectrum with the zero frequency centered.
    Fourier,
    /// `|next - current|`.
    Derivative,
    /// Blurred derivative field.
    SmoothedDerivative,
}

impl DisplayMode {
    pub const ALL: [Self; 4] = [
        Self::Raw,
        Self::Fourier,
        Self::Derivative,
        Self::SmoothedDerivative,
    ];

    /// Step through [`Self::ALL`], wrapping in both directions.
    #[must_use]
    pub fn cycle(self, step: i32) -> Self {
        let len = Self::ALL.len() as i64;
        let index = Self::ALL.iter().position(|&mode| mode == self).unwrap_or(0) as i64;
        Self::ALL[(index + i64::from(step)).rem_euclid(len) as usize]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Fourier => "fourier",
            Self::Derivative => "derivative",
            Self::SmoothedDerivative => "smoothed-derivative",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown display mode `{0}` (expected raw, fourier, derivative or smoothed-derivative)")]
pub struct ParseDisplayModeError(String);

impl FromStr for DisplayMode {
    type Err = ParseDisplayModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "raw" => Ok(Self::Raw),
            "fourier" => Ok(Self::Fourier),
            "derivative" => Ok(Self::Derivative),
            "smoothed-derivative" | "smoothed" => Ok(Self::SmoothedDerivative),
            _ => Err(ParseDisplayModeError(s.to_owned())),
        }
    }
}

/// Write `ln(1 + |F|)` of `spectrum` into `out`, quadrant-swapped so the zero
/// frequency sits at the center, scaled so the largest value is 1.
pub fn spectrum_view(spectrum: &LatticeSpectrum, out: &mut [f32]) {
    let (w, h) = (spectrum.width(), spectrum.height());
    debug_assert_eq!(out.len(), w * h);
    let bins = spectrum.bins();
    let mut max = 0.0_f32;
    for y in 0..h {
        let src_row = ((y + h - h / 2) % h) * w;
        for x in 0..w {
            let value = bins[src_row + (x + w - w / 2) % w].norm().ln_1p();
            out[y * w + x] = value;
            max = max.max(value);
        }
    }
    if max > 0.0 && max.is_finite() {
        for value in out.iter_mut() {
            *value /= max;
        }
    }
}

/// Blend `frame` into `display` as `(1 - p) * frame + p * display`.
pub fn blend_into(display: &mut [f32], frame: &[f32], persistence: f32) {
    debug_assert_eq!(display.len(), frame.len());
    if persistence <= 0.0 {
        display.copy_from_slice(frame);
        return;
    }
    let keep = 1.0 - persistence;
    for (out, &value) in display.iter_mut().zip(frame) {
        *out = keep * value + persistence * *out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolution::Convolver;
    use crate::lattice::Lattice;

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(DisplayMode::Raw.cycle(1), DisplayMode::Fourier);
        assert_eq!(DisplayMode::Raw.cycle(-1), DisplayMode::SmoothedDerivative);
        assert_eq!(DisplayMode::Fourier.cycle(4), DisplayMode::Fourier);
        assert_eq!(DisplayMode::Derivative.cycle(-6), DisplayMode::Raw);
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("fourier".parse(), Ok(DisplayMode::Fourier));
        assert_eq!(
            "smoothed_derivative".parse(),
            Ok(DisplayMode::SmoothedDerivative)
        );
        assert_eq!("RAW".parse(), Ok(DisplayMode::Raw));
        assert!("sepia".parse::<DisplayMode>().is_err());
        for mode in DisplayMode::ALL {
            assert_eq!(mode.to_string().parse(), Ok(mode));
        }
    }

    #[test]
    fn uniform_lattice_spectrum_peaks_at_center() {
        let lattice = Lattice::new(8, 6, 1.0).expect("lattice");
        let convolver = Convolver::new(8, 6);
        let spectrum = convolver.transform(&lattice);
        let mut out = vec![0.0; 48];
        spectrum_view(&spectrum, &mut out);
        assert!((out[3 * 8 + 4] - 1.0).abs() < 1e-6);
        let others = out
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != 3 * 8 + 4)
            .map(|(_, &v)| v)
            .fold(0.0_f32, f32::max);
        assert!(others < 1e-3);
    }

    #[test]
    fn blend_respects_persistence() {
        let mut display = vec![1.0, 0.0];
        blend_into(&mut display, &[0.0, 1.0], 0.7);
        assert!((display[0] - 0.7).abs() < 1e-6);
        assert!((display[1] - 0.3).abs() < 1e-6);
        blend_into(&mut display, &[0.25, 0.5], 0.0);
        assert_eq!(display, vec![0.25, 0.5]);
    }
}
