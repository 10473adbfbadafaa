//! Shared types for the deadlock detector workspace.
//!
//! Holds the error taxonomy and the pipeline's configuration values so both
//! the `core` and `cli` crates agree on them without depending on each
//! other.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
