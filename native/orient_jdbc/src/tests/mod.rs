//! Unit and integration tests for orient_jdbc
//!
//! This module organizes all tests into logical submodules that correspond to
//! the main library modules.

mod cursor_tests;
mod error_handling_tests;
mod proptest_tests;
