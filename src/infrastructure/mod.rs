//! Infrastructure layer - External service implementations

pub mod cache;
pub mod conformance;
pub mod generator;
pub mod http_client;
pub mod logging;
pub mod observability;
pub mod services;
