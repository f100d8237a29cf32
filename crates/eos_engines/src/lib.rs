#![forbid(unsafe_code)]

pub mod answer;
pub mod dispatch;
pub mod focus;
pub mod questionnaire;
