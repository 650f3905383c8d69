//! Unit tests for the tool registry service.

mod registry_tests;
