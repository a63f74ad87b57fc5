//! Index stack computed from a resolved band set

use super::indices::{ndbi, ndbsi, ndvi, ndwi};
use super::thermal::{lst_celsius, lst_kelvin, thermal_plausibility};
use crate::bands::{BandName, BandSet};
use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thermanom_core::raster::Raster;
use thermanom_core::{Algorithm, Error, Result};

/// Enumeration of the derived index layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Water Index
    Ndwi,
    /// Normalized Difference Built-up Index
    Ndbi,
    /// Normalized Difference Bare Soil Index
    Ndbsi,
    /// Land surface temperature in Kelvin
    LstKelvin,
    /// Land surface temperature in degrees Celsius
    LstCelsius,
}

impl SpectralIndex {
    /// Non-thermal indices usable as temperature predictors
    pub const PREDICTORS: [SpectralIndex; 4] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Ndwi,
        SpectralIndex::Ndbi,
        SpectralIndex::Ndbsi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "ndvi",
            SpectralIndex::Ndwi => "ndwi",
            SpectralIndex::Ndbi => "ndbi",
            SpectralIndex::Ndbsi => "ndbsi",
            SpectralIndex::LstKelvin => "lst_kelvin",
            SpectralIndex::LstCelsius => "lst_celsius",
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derived index rasters of one scene, immutable once computed
#[derive(Debug, Clone)]
pub struct IndexStack {
    ndvi: Raster<f64>,
    ndwi: Raster<f64>,
    ndbi: Raster<f64>,
    ndbsi: Raster<f64>,
    lst_kelvin: Raster<f64>,
    lst_celsius: Raster<f64>,
    diagnostics: Vec<Diagnostic>,
}

impl IndexStack {
    /// Compute every index from a resolved band set.
    ///
    /// Thermal plausibility problems are recorded as diagnostics; computation
    /// always continues.
    pub fn compute(bands: &BandSet) -> Result<Self> {
        let blue = bands.require(BandName::Blue)?;
        let green = bands.require(BandName::Green)?;
        let red = bands.require(BandName::Red)?;
        let nir = bands.require(BandName::Nir)?;
        let swir1 = bands.require(BandName::Swir1)?;
        let thermal = bands.require(BandName::Thermal)?;

        let lst_k = lst_kelvin(thermal);
        let diagnostics = thermal_plausibility(thermal, &lst_k);

        let stack = Self {
            ndvi: ndvi(nir, red)?,
            ndwi: ndwi(green, nir)?,
            ndbi: ndbi(swir1, nir)?,
            ndbsi: ndbsi(red, swir1, nir, blue)?,
            lst_celsius: lst_celsius(&lst_k),
            lst_kelvin: lst_k,
            diagnostics,
        };

        if let Some(max) = stack.lst_kelvin.statistics().max {
            tracing::debug!(max_kelvin = max, "computed spectral indices");
        }
        Ok(stack)
    }

    pub fn get(&self, index: SpectralIndex) -> &Raster<f64> {
        match index {
            SpectralIndex::Ndvi => &self.ndvi,
            SpectralIndex::Ndwi => &self.ndwi,
            SpectralIndex::Ndbi => &self.ndbi,
            SpectralIndex::Ndbsi => &self.ndbsi,
            SpectralIndex::LstKelvin => &self.lst_kelvin,
            SpectralIndex::LstCelsius => &self.lst_celsius,
        }
    }

    pub fn lst_celsius(&self) -> &Raster<f64> {
        &self.lst_celsius
    }

    pub fn shape(&self) -> (usize, usize) {
        self.lst_celsius.shape()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Spectral index stage
#[derive(Debug, Clone, Default)]
pub struct SpectralIndices;

impl Algorithm for SpectralIndices {
    type Input = BandSet;
    type Output = IndexStack;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpectralIndices"
    }

    fn description(&self) -> &'static str {
        "NDVI, NDWI, NDBI, NDBSI and land surface temperature from resolved bands"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        IndexStack::compute(&input)
    }
}
