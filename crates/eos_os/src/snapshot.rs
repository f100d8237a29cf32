#![forbid(unsafe_code)]

use eos_kernel_contracts::state::ControlState;
use eos_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    Contract(ContractViolation),
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        SnapshotError::Json(value)
    }
}

impl From<ContractViolation> for SnapshotError {
    fn from(value: ContractViolation) -> Self {
        SnapshotError::Contract(value)
    }
}

/// Serializes control state for the surrounding session runtime, which owns
/// durable persistence between turns.
pub fn encode_state(state: &ControlState) -> Result<String, SnapshotError> {
    state.validate()?;
    Ok(serde_json::to_string(state)?)
}

/// Restores control state from a persisted snapshot. Re-validates the
/// contract so a tampered or stale snapshot fails closed.
pub fn decode_state(raw: &str) -> Result<ControlState, SnapshotError> {
    let state: ControlState = serde_json::from_str(raw)?;
    state.validate()?;
    Ok(state)
}
