use std::sync::{MutexGuard, PoisonError};

use crossfire::TrySendError;
use kernelife_core::{ControlCommand, DisplayMode, RuleParams, Tick};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::command::CommandSender;
use crate::keymap::KeyMap;
use crate::{SharedSession, SimulationSession};

/// Errors surfaced to control clients.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to lock simulation session")]
    Lock,
    #[error("command queue is full; retry later")]
    CommandQueueFull,
    #[error("command queue has been closed")]
    CommandQueueClosed,
    #[error("no command bound to key `{0}`")]
    UnboundKey(char),
}

impl From<PoisonError<MutexGuard<'_, SimulationSession>>> for ControlError {
    fn from(_: PoisonError<MutexGuard<'_, SimulationSession>>) -> Self {
        ControlError::Lock
    }
}

/// Point-in-time view of the session for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tick: Tick,
    pub elapsed: f64,
    pub rules: RuleParams,
    pub display_mode: DisplayMode,
    pub live_fraction: f32,
}

/// Shared handle used by input surfaces to reach the running session.
#[derive(Clone)]
pub struct ControlHandle {
    session: SharedSession,
    commands: CommandSender,
    keymap: KeyMap,
}

impl ControlHandle {
    pub fn new(session: SharedSession, commands: CommandSender) -> Self {
        Self::with_keymap(session, commands, KeyMap::default())
    }

    pub fn with_keymap(session: SharedSession, commands: CommandSender, keymap: KeyMap) -> Self {
        Self {
            session,
            commands,
            keymap,
        }
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, SimulationSession>, ControlError> {
        self.session.lock().map_err(|err| err.into())
    }

    #[must_use]
    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    /// Queue a command for the next tick boundary.
    pub fn enqueue(&self, command: ControlCommand) -> Result<(), ControlError> {
        self.commands.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => ControlError::CommandQueueFull,
            TrySendError::Disconnected(_) => ControlError::CommandQueueClosed,
        })
    }

    /// Resolve `key` through the key map and queue the bound command.
    pub fn press_key(&self, key: char) -> Result<ControlCommand, ControlError> {
        let command = self
            .keymap
            .resolve(key)
            .cloned()
            .ok_or(ControlError::UnboundKey(key))?;
        self.enqueue(command.clone())?;
        info!(%key, ?command, "key pressed");
        Ok(command)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, ControlError> {
        let session = self.lock_session()?;
        Ok(session.snapshot())
    }

    pub fn rules(&self) -> Result<RuleParams, ControlError> {
        Ok(self.lock_session()?.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{create_command_bus, drain_pending_commands};
    use kernelife_core::{KernelShape, KernelSlotConfig, RuleKnob, SimulationConfig};
    use std::sync::{Arc, Mutex};

    fn shared_session() -> SharedSession {
        let config = SimulationConfig {
            width: 16,
            height: 16,
            rng_seed: Some(1),
            kernels: vec![KernelSlotConfig::from(KernelShape::Moore { size: 3 })],
            derivative_blur_sigma: 1.0,
            ..SimulationConfig::default()
        };
        Arc::new(Mutex::new(
            SimulationSession::new(config, RuleParams::default()).expect("session"),
        ))
    }

    #[test]
    fn key_presses_apply_after_drain() {
        let session = shared_session();
        let (tx, rx) = create_command_bus(8);
        let handle = ControlHandle::new(Arc::clone(&session), tx);

        handle.press_key('a').expect("a");
        handle.press_key('f').expect("f");
        assert_eq!(handle.rules().expect("rules").pop_max, 0.5);

        let mut guard = session.lock().expect("lock");
        assert_eq!(drain_pending_commands(&rx, &mut guard), 2);
        assert!((guard.rules.get(RuleKnob::PopMax) - 0.51).abs() < 1e-6);
        assert_eq!(guard.simulation.display_mode(), DisplayMode::Fourier);
    }

    #[test]
    fn unbound_keys_and_full_queue_are_errors() {
        let session = shared_session();
        let (tx, _rx) = create_command_bus(1);
        let handle = ControlHandle::new(session, tx);
        assert!(matches!(
            handle.press_key('z'),
            Err(ControlError::UnboundKey('z'))
        ));
        handle.enqueue(ControlCommand::Clear).expect("first");
        assert!(matches!(
            handle.enqueue(ControlCommand::Clear),
            Err(ControlError::CommandQueueFull)
        ));
    }

    #[test]
    fn rejected_commands_do_not_stop_the_drain() {
        let session = shared_session();
        let (tx, rx) = create_command_bus(8);
        let handle = ControlHandle::new(Arc::clone(&session), tx);
        handle
            .enqueue(ControlCommand::SetKernelGain {
                slot: 9,
                gain: 1.0,
            })
            .expect("queued");
        handle.enqueue(ControlCommand::Clear).expect("queued");
        let mut guard = session.lock().expect("lock");
        assert_eq!(drain_pending_commands(&rx, &mut guard), 1);
        assert_eq!(guard.simulation.lattice().sum(), 0.0);
    }
}
