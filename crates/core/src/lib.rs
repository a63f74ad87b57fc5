//! # Thermanom Core
//!
//! Core types, errors and raster I/O for the thermanom thermal anomaly toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `Mask`: Boolean raster used for QA, anomaly and zone masks
//! - `BandStack`: Described multi-band input sharing one grid
//! - `GeoTransform` / `CRS`: Georeferencing metadata
//! - `Error`: Structured error taxonomy shared by every stage
//! - I/O for multi-band GeoTIFF input and single-band output

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{BandStack, GeoTransform, Mask, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{BandStack, GeoTransform, Mask, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for the analysis stages.
///
/// A stage is a pure function from an input to an output, controlled by a
/// parameter struct with sensible defaults.
pub trait Algorithm {
    /// Input type for the stage
    type Input;
    /// Output type for the stage
    type Output;
    /// Parameters controlling stage behavior
    type Params: Default;
    /// Error type for stage execution
    type Error: std::error::Error;

    /// Returns the stage name
    fn name(&self) -> &'static str;

    /// Returns a description of what the stage does
    fn description(&self) -> &'static str;

    /// Execute the stage
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
