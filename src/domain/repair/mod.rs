//! Repair session types

mod fast_path;
mod outcome;

pub use fast_path::is_trivially_simple;
pub use outcome::{AttemptRecord, AttemptStatus, RepairOptions, RepairOutcome, DEFAULT_MAX_ATTEMPTS};
