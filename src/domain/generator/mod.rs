//! External workflow generator collaborator

mod extract;
mod generator;

pub use extract::extract_document;
pub use generator::WorkflowGenerator;

#[cfg(test)]
pub use generator::MockWorkflowGenerator;
