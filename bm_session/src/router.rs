use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;

use crate::machine::StateMachine;
use crate::state::Identity;
use crate::state::Sessions;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Text received from an allowed chat user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub identity: Identity,
    pub text: String,
}

/// Session thread loop.
///
/// Owns every session and feeds it events one at a time, in arrival order. Returns when the event
/// channel disconnects or `shutdown` is raised.
pub fn run_router(event_rx: Receiver<InboundEvent>, machine: StateMachine, shutdown: Arc<AtomicBool>) -> Sessions {
    let mut sessions = Sessions::new();

    tracing::info!("Session thread started");

    loop {
        match event_rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                tracing::debug!(identity = %event.identity, "Event received");
                if let Some(reply) = sessions.dispatch(&machine, event.identity, &event.text) {
                    machine.services().sender.send_reply(event.identity, reply);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.load(Ordering::Acquire) {
                    tracing::info!("Session thread stopping on shutdown");
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Session thread shutting down");
                break;
            }
        }
    }

    sessions
}
