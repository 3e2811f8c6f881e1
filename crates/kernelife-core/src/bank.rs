//! Kernel bank: kernels plus their cached lattice-sized spectra.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convolution::{Convolver, KernelSpectrum};
use crate::kernel::{Kernel, KernelError, KernelShape};

/// Configuration for one bank slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSlotConfig {
    pub shape: KernelShape,
    /// Multiplier applied to this kernel's density before the rule sees it.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Inactive kernels keep their spectrum but are skipped each tick.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_gain() -> f32 {
    1.0
}

fn default_active() -> bool {
    true
}

impl Default for KernelSlotConfig {
    fn default() -> Self {
        Self::from(KernelShape::default())
    }
}

impl From<KernelShape> for KernelSlotConfig {
    fn from(shape: KernelShape) -> Self {
        Self {
            shape,
            gain: default_gain(),
            active: default_active(),
        }
    }
}

/// A kernel with its derived spectrum and mixing settings.
#[derive(Debug, Clone)]
pub struct KernelSlot {
    label: &'static str,
    kernel: Kernel,
    spectrum: KernelSpectrum,
    gain: f32,
    active: bool,
}

impl KernelSlot {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub const fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    #[must_use]
    pub const fn spectrum(&self) -> &KernelSpectrum {
        &self.spectrum
    }

    #[must_use]
    pub const fn gain(&self) -> f32 {
        self.gain
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

/// Ordered set of kernels sized for one lattice.
#[derive(Debug, Clone)]
pub struct KernelBank {
    convolver: Convolver,
    slots: Vec<KernelSlot>,
}

impl KernelBank {
    /// Empty bank whose spectra are planned by `convolver`.
    #[must_use]
    pub fn new(convolver: Convolver) -> Self {
        Self {
            convolver,
            slots: Vec::new(),
        }
    }

    /// Build a bank from slot configurations, failing on the first invalid kernel.
    pub fn from_configs(
        convolver: Convolver,
        configs: &[KernelSlotConfig],
    ) -> Result<Self, KernelError> {
        let mut bank = Self::new(convolver);
        for config in configs {
            let index = bank.push(
                config.shape.label(),
                Kernel::from_shape(&config.shape)?,
                config.gain,
            )?;
            bank.set_active(index, config.active)?;
        }
        Ok(bank)
    }

    /// Add a kernel, returning its slot index.
    pub fn push(
        &mut self,
        label: &'static str,
        kernel: Kernel,
        gain: f32,
    ) -> Result<usize, KernelError> {
        check_gain(gain)?;
        let spectrum = self.convolver.kernel_spectrum(&kernel)?;
        self.slots.push(KernelSlot {
            label,
            kernel,
            spectrum,
            gain,
            active: true,
        });
        debug!(
            slot = self.slots.len() - 1,
            label,
            size = self.slots[self.slots.len() - 1].kernel.size(),
            "kernel added to bank"
        );
        Ok(self.slots.len() - 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[KernelSlot] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&KernelSlot> {
        self.slots.get(index)
    }

    /// Iterate over slots that take part in the next tick.
    pub fn active_slots(&self) -> impl Iterator<Item = &KernelSlot> {
        self.slots.iter().filter(|slot| slot.active)
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut KernelSlot, KernelError> {
        self.slots
            .get_mut(index)
            .ok_or(KernelError::UnknownSlot(index))
    }

    /// Overwrite one weight and refresh the cached spectrum.
    ///
    /// The slot is left untouched when the edited kernel would be invalid.
    pub fn set_weight(
        &mut self,
        index: usize,
        x: usize,
        y: usize,
        value: f32,
    ) -> Result<(), KernelError> {
        let edited = self.slot_mut(index)?.kernel.with_weight(x, y, value)?;
        self.install(index, edited)
    }

    /// Replace every weight of a slot's kernel, keeping its size.
    pub fn replace_weights(&mut self, index: usize, weights: Vec<f32>) -> Result<(), KernelError> {
        let size = self.slot_mut(index)?.kernel.size();
        let kernel = Kernel::from_weights(size, weights)?;
        self.install(index, kernel)
    }

    /// Swap in a different kernel (any valid size) for an existing slot.
    pub fn replace_kernel(&mut self, index: usize, kernel: Kernel) -> Result<(), KernelError> {
        self.slot_mut(index)?;
        self.install(index, kernel)
    }

    fn install(&mut self, index: usize, kernel: Kernel) -> Result<(), KernelError> {
        let spectrum = self.convolver.kernel_spectrum(&kernel)?;
        let slot = self.slot_mut(index)?;
        slot.kernel = kernel;
        slot.spectrum = spectrum;
        debug!(slot = index, sum = slot.kernel.sum(), "kernel spectrum refreshed");
        Ok(())
    }

    pub fn set_gain(&mut self, index: usize, gain: f32) -> Result<(), KernelError> {
        check_gain(gain)?;
        self.slot_mut(index)?.gain = gain;
        Ok(())
    }

    pub fn set_active(&mut self, index: usize, active: bool) -> Result<(), KernelError> {
        self.slot_mut(index)?.active = active;
        Ok(())
    }
}

fn check_gain(gain: f32) -> Result<(), KernelError> {
    if gain.is_finite() {
        Ok(())
    } else {
        Err(KernelError::InvalidGain(gain))
    }
}
