use crossfire::mpmc;
use crossfire::{MAsyncTx, MRx, TryRecvError, detect_backoff_cfg};
use kernelife_core::ControlCommand;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::SimulationSession;

pub type CommandSender = MAsyncTx<ControlCommand>;
pub type CommandReceiver = MRx<ControlCommand>;
pub type CommandDrain = Arc<dyn Fn(&mut SimulationSession) -> usize + Send + Sync>;

pub fn create_command_bus(capacity: usize) -> (CommandSender, CommandReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_tx_async_rx_blocking(capacity.max(1))
}

/// Apply every queued command, returning how many succeeded.
///
/// Rejected commands are logged and skipped; they never abort the drain.
pub fn drain_pending_commands(receiver: &CommandReceiver, session: &mut SimulationSession) -> usize {
    let mut applied = 0;
    loop {
        match receiver.try_recv() {
            Ok(command) => {
                debug!(?command, "applying control command");
                match session.apply(command.clone()) {
                    Ok(()) => applied += 1,
                    Err(err) => warn!(?command, %err, "control command rejected"),
                }
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => break,
        }
    }
    applied
}

pub fn make_command_drain(receiver: CommandReceiver) -> CommandDrain {
    let receiver = Arc::new(receiver);
    Arc::new(move |session: &mut SimulationSession| {
        drain_pending_commands(&receiver, session)
    })
}
