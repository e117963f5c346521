//! Regeneration backends

mod openai;

pub use openai::{create_generator, OpenAiWorkflowGenerator};
