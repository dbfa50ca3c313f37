//! Centralized error handling for stacgen
//!
//! Every fallible operation in the crate returns [`Result`], so callers can
//! propagate store, Zarr and STAC failures with `?`.

use thiserror::Error;

/// Main error type for stacgen operations
#[derive(Debug, Error)]
pub enum StacGenError {
    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML (de)serialization errors
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Object store answered with an unexpected status or could not be built
    #[error("Store error: {0}")]
    Store(String),

    /// Store refused the request (HTTP 403). S3 also answers this way for
    /// missing keys when the caller may not list the bucket.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A required key is absent from the store
    #[error("Key '{key}' not found in {store}")]
    KeyNotFound { store: String, key: String },

    /// Malformed Zarr metadata or chunk data
    #[error("Zarr error: {0}")]
    ZarrError(String),

    /// Array not present in the dataset
    #[error("Array '{array}' not found in dataset")]
    ArrayNotFound { array: String },

    /// Data type not understood by the chunk decoder
    #[error("Unsupported dtype '{0}'")]
    UnsupportedDtype(String),

    /// Compressor not understood by the chunk decoder
    #[error("Unsupported compressor '{0}'")]
    UnsupportedCompressor(String),

    /// No recognised spatial coordinate pair in the dataset
    #[error("Dataset does not have recognized spatial coordinates ('lon', 'lat'), ('longitude', 'latitude') or ('x', 'y')")]
    MissingSpatialCoordinates,

    /// No `time` coordinate in the dataset
    #[error("Dataset does not have a 'time' coordinate")]
    MissingTimeCoordinate,

    /// Coordinate present but without any valid value
    #[error("Coordinate '{0}' has no valid values")]
    EmptyCoordinate(String),

    /// Time coordinate encoding not understood
    #[error("Cannot decode time coordinate '{var}': {message}")]
    TimeDecode { var: String, message: String },

    /// Every store configuration failed to open the dataset
    #[error("Failed to open Zarr dataset with ID {dataset_id}. Tried configurations: {}. Last error: {last_error}", .tried.join(", "))]
    DatasetOpen {
        dataset_id: String,
        tried: Vec<String>,
        last_error: Box<StacGenError>,
    },

    /// Missing or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Value could not be converted into JSON
    #[error("Object of type {type_name} is not JSON serializable: {message}")]
    Serialization { type_name: String, message: String },

    /// Generic error for ad-hoc messages
    #[error("{0}")]
    Generic(String),
}

impl From<String> for StacGenError {
    fn from(error: String) -> Self {
        StacGenError::Generic(error)
    }
}

impl From<&str> for StacGenError {
    fn from(error: &str) -> Self {
        StacGenError::Generic(error.to_string())
    }
}

/// Result type alias for stacgen operations
pub type Result<T> = std::result::Result<T, StacGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_open_lists_tried_configurations() {
        let err = StacGenError::DatasetOpen {
            dataset_id: "cube.zarr".to_string(),
            tried: vec!["Public store".to_string(), "Authenticated store".to_string()],
            last_error: Box::new(StacGenError::Store("denied".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to open Zarr dataset with ID cube.zarr"));
        assert!(msg.contains("Public store, Authenticated store"));
        assert!(msg.ends_with("Last error: Store error: denied"));
    }

    #[test]
    fn generic_from_str() {
        let err: StacGenError = "plain".into();
        assert_eq!(err.to_string(), "plain");
    }
}
