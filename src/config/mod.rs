// src/config/mod.rs

//! Problem-description loading and validation.
//!
//! - [`model`] is the raw TOML mapping (`[run]`, `[tensor.<name>]`,
//!   `[[step]]`).
//! - [`loader`] reads and parses files.
//! - [`validate`] runs the semantic checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, RunSection, StepConfig, TensorConfig};
pub use validate::validate_config;
