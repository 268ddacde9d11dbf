//! # RFSE Tools
//!
//! Command-line tooling around the simulation engine:
//! - Data validators
//! - Scenario runner and forecasts
//! - Plan optimization
//! - Parallel what-if comparison

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod compare;
pub mod report;
pub mod scenario;
pub mod validate;

pub use scenario::{Scenario, ToolError};
