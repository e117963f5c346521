//! Domain layer - workflow model, validation, repair and their seams

pub mod cache;
pub mod classifier;
pub mod conformance;
pub mod document;
pub mod error;
pub mod fixer;
pub mod generator;
pub mod repair;
pub mod validation;

pub use cache::{CacheEntry, CacheKey, CacheStats, RepairCache};
pub use classifier::{ErrorClassification, ErrorClassifier, ErrorKind, FixStrategy};
pub use conformance::{ConformanceResult, ConformanceTester, ConformanceTransport};
pub use document::{Node, NodeFamily, WorkflowDocument};
pub use error::DomainError;
pub use fixer::{FixReport, Fixer};
pub use generator::{extract_document, WorkflowGenerator};
pub use repair::{AttemptRecord, AttemptStatus, RepairOptions, RepairOutcome};
pub use validation::{StructuralValidator, ValidationOptions, ValidationResult};
