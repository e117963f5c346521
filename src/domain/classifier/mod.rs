//! Engine error classification
//!
//! Raw error strings returned by the engine are mapped to an error kind and
//! the deterministic fix that addresses it. The table is plain ordered data;
//! the first matching row wins.

mod classification;
mod patterns;

pub use classification::{ErrorClassification, ErrorKind, FixStrategy};
pub use patterns::{ErrorClassifier, ErrorPattern};
