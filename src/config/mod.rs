//! Configuration module
//!
//! Loads and validates widget configuration files: the cycle threshold,
//! the timer-driven phase durations and the terminal phase.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, EnvSource, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::Validator;
