// src/error.rs

use thiserror::Error;

/// Root causes the outer surfaces care about. Internal code still returns
/// `anyhow::Result`; these are raised as the innermost error and recovered
/// with `downcast_ref` where a status code or exit message depends on them.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("data source '{source_name}' unavailable: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("{dataset}: required column '{column}' not found in header")]
    MissingColumn { dataset: String, column: String },

    #[error("{dataset}: parse error at line {line}: {message}")]
    Parse {
        dataset: String,
        line: u64,
        message: String,
    },

    #[error("invalid value '{value}' for {field}")]
    InvalidSelection { field: String, value: String },

    #[error("snapshot '{path}' unusable: {reason}")]
    Snapshot { path: String, reason: String },
}

impl DashboardError {
    pub fn invalid(field: &str, value: &str) -> Self {
        DashboardError::InvalidSelection {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Walk an anyhow chain and return the first `DashboardError` in it.
    pub fn find(err: &anyhow::Error) -> Option<&DashboardError> {
        err.chain().find_map(|e| e.downcast_ref::<DashboardError>())
    }
}
