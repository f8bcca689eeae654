//! Common test utilities for integration tests.
//!
//! # Modules
//!
//! - `logger`: Structured test logging

pub mod logger;
