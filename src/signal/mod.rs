//! Ctrl-C handling
//!
//! First interrupt: cancel the shared token so the running poll returns
//! `Cancelled` and the command can write its run summary and exit with 80.
//! Second interrupt: exit immediately with 80.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::summary::ExitCode;

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: graceful cancellation
    InitiateCancellation,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal (the process is already exiting)
    Ignore,
}

/// Tracks interrupts and forwards the first one to a [`CancelToken`].
#[derive(Debug)]
pub struct SignalState {
    token: CancelToken,
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            signal_count: AtomicU8::new(0),
        }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.token.cancel();
                SignalAction::InitiateCancellation
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

/// Install the process-wide Ctrl-C handler. Call once at startup.
pub fn install(token: CancelToken) -> Result<Arc<SignalState>, ctrlc::Error> {
    let state = Arc::new(SignalState::new(token));
    let handler_state = Arc::clone(&state);
    ctrlc::set_handler(move || match handler_state.handle_signal() {
        SignalAction::InitiateCancellation => {
            eprintln!("\nInterrupted, stopping after the current request (Ctrl-C again to exit now)...");
        }
        SignalAction::ImmediateExit => {
            eprintln!("\nExiting immediately.");
            std::process::exit(ExitCode::Cancelled.as_i32());
        }
        SignalAction::Ignore => {}
    })?;
    Ok(state)
}
