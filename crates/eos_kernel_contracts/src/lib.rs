#![forbid(unsafe_code)]

pub mod act;
pub mod common;
pub mod questionnaire;
pub mod state;
pub mod turn_input;

pub use common::{
    ContractViolation, CorrelationId, ReasonCodeId, SchemaVersion, TurnId, Validate,
};
