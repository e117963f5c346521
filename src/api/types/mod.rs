//! API request, response and error types

pub mod error;
pub mod json;
pub mod workflow;

pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use workflow::{
    parse_workflow, ClassifyRequest, FixRequest, FixResponse, RepairRequest,
    RepairRequestOptions, ValidateRequest,
};
