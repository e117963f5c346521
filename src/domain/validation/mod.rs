//! Structural validation of workflow documents

mod complexity;
mod options;
mod result;
pub mod rules;
mod validator;

pub use complexity::{ComplexityLevel, ComplexityReport};
pub use options::ValidationOptions;
pub use result::{IssueKind, Severity, ValidationIssue, ValidationResult};
pub use validator::StructuralValidator;
