//! Record keeping and workflow orchestration for faculty tenure-track
//! dossiers and student credit-equivalence requests.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
