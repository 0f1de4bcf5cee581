//! Error types for the tagcolumns crate.
//!
//! Only construction and persistence failures surface as [`ColumnsError`].
//! Evaluation failures never do: providers recover them locally to an empty
//! cell value.

use thiserror::Error;

/// Errors that can occur when building, registering or persisting columns.
#[derive(Debug, Error)]
pub enum ColumnsError {
    /// A column was constructed with [`SortType::SortKey`](crate::SortType)
    /// but without a sort function.
    #[error("column '{key}' uses SORTKEY sorting but has no sort key function")]
    MissingSortKey { key: String },

    /// A second status-icon column was added to a columns collection.
    #[error("only one status icon column is supported (already at position {existing})")]
    DuplicateStatusIcon { existing: usize },

    /// Registration targeted a view the registry does not host.
    #[error("unknown view: {0}")]
    UnknownView(String),

    /// Reading or writing the spec store failed.
    #[error("spec store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The spec store could not be encoded or decoded as JSON.
    #[error("spec store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The spec store could not be encoded or decoded as YAML.
    #[error("spec store YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for tagcolumns operations.
pub type Result<T> = std::result::Result<T, ColumnsError>;
