pub mod config;
pub mod yaml_include;

/// Common utilities shared across the admin dashboard workspace
///
/// This crate provides functionality used by more than one crate:
///
/// - Layered YAML configuration (`!include` support)
/// - JSON fixtures for API responses used by the test suites

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{envelope, generate_unique_id, list_envelope};
