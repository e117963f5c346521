//! Conformance testing against the live engine

mod tester;

pub use tester::{ConformanceResult, ConformanceTester, ConformanceTransport};

#[cfg(test)]
pub use tester::MockConformanceTester;
