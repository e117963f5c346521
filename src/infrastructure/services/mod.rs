//! Infrastructure services

mod repair_service;

pub use repair_service::{timeout_from_secs, RepairService};
