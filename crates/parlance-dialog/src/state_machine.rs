//! Lifecycle of one intent invocation.
//!
//! Start -> HandlerRunning -> OutputCollected -> Finalized
//! HandlerRunning -> Error -> Finalized
//! Start -> Error (no handler could be resolved)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DialogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Start,
    HandlerRunning,
    OutputCollected,
    Error,
    Finalized,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvocationState::Start => "start",
            InvocationState::HandlerRunning => "handler_running",
            InvocationState::OutputCollected => "output_collected",
            InvocationState::Error => "error",
            InvocationState::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: InvocationState, to: InvocationState) -> Result<(), DialogError> {
    use InvocationState::*;

    let valid = matches!(
        (from, to),
        (Start, HandlerRunning)
            | (Start, Error)
            | (HandlerRunning, OutputCollected)
            | (HandlerRunning, Error)
            | (OutputCollected, Finalized)
            | (Error, Finalized)
    );

    if valid {
        Ok(())
    } else {
        Err(DialogError::InvalidTransition(from, to))
    }
}

/// Tracks the current state and rejects out-of-order transitions.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: InvocationState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: InvocationState::Start,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn advance(&mut self, to: InvocationState) -> Result<(), DialogError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
