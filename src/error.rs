//! Error types for locus-viz operations.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in locus-viz operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (layout files, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML layout parsing error.
    #[error("YAML layout error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON value conversion error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A layout is missing a required section or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A caller passed an argument the operation cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A render operation ran before the render tree was created.
    #[error("Data layer [{0}] has not been initialized")]
    NotInitialized(String),

    /// A document node was used after being removed.
    #[error("Document node {0} no longer exists")]
    StaleNode(usize),

    /// A refresh resolved while the layer's data was still borrowed.
    #[error("Data layer [{0}] data was borrowed when its refresh resolved")]
    DataBorrowed(String),

    /// The data source rejected a request.
    #[error("Data source error: {0}")]
    DataSource(String),
}
