//! Error types for thermanom

use thiserror::Error;

/// Main error type for thermanom operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Grid mismatch for band '{band}': {reason}")]
    GridMismatch { band: String, reason: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Band mapping is missing required bands: {}", .names.join(", "))]
    MissingBands { names: Vec<String> },

    #[error("Unknown band name '{name}' (recognized: {})", .recognized.join(", "))]
    UnknownBand {
        name: String,
        recognized: Vec<String>,
    },

    #[error(
        "Band '{key}' expects description '{expected}', available descriptions: [{}]",
        .available.join(", ")
    )]
    BandNotFound {
        key: String,
        expected: String,
        available: Vec<String>,
    },

    #[error("Insufficient data: {valid} valid pixels, at least {required} required to fit the model")]
    InsufficientData { valid: usize, required: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for thermanom operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bands_lists_every_name() {
        let err = Error::MissingBands {
            names: vec!["nir".into(), "thermal".into()],
        };
        assert_eq!(
            err.to_string(),
            "Band mapping is missing required bands: nir, thermal"
        );
    }

    #[test]
    fn test_band_not_found_context() {
        let err = Error::BandNotFound {
            key: "thermal".into(),
            expected: "ST_B10".into(),
            available: vec!["SR_B2".into(), "SR_B3".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("thermal"));
        assert!(msg.contains("ST_B10"));
        assert!(msg.contains("SR_B2, SR_B3"));
    }
}
