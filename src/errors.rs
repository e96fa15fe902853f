// src/errors.rs

//! Crate-wide error types.
//!
//! Soft failures (configuration, IO, expression syntax) surface as
//! [`TensordagError`]; programming errors inside the scheduler are fatal
//! assertions.

use std::path::PathBuf;

use thiserror::Error;

use crate::expr::ParseError;

#[derive(Error, Debug)]
pub enum TensordagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing TOML from {path:?}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown tensor '{0}'")]
    UnknownTensor(String),

    #[error("expression error: {0}")]
    Expr(#[from] ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TensordagError>;
