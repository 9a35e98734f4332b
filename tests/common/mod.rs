//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use rstest::fixture;
use webwindow::WindowConfig;
use webwindow_testing::Harness;

/// Result type returned by fallible tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Harness around a window with the default configuration.
#[fixture]
pub fn harness() -> Harness { Harness::new(WindowConfig::default()) }

/// Build a configuration from `builder` for a test.
pub fn config(builder: webwindow::WindowConfigBuilder) -> WindowConfig {
    builder.build().expect("test configuration should be valid")
}
