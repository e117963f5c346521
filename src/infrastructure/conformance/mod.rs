//! Conformance transports against the live engine

mod factory;
mod management_api;
mod untested;
mod webhook;

pub use factory::create_tester;
pub use management_api::ManagementApiTester;
pub use untested::UntestedTester;
pub use webhook::WebhookTester;
