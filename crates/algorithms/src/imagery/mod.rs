//! Spectral index engine
//!
//! - Normalized difference indices: NDVI, NDWI, NDBI, NDBSI
//! - Land surface temperature (Kelvin and Celsius) from Level-2 thermal DNs
//! - Thermal plausibility diagnostics

mod indices;
mod stack;
mod thermal;

pub(crate) use indices::build_output;
pub use indices::{ndbi, ndbsi, ndvi, ndwi, normalized_difference, normalized_difference_sum};
pub use stack::{IndexStack, SpectralIndex, SpectralIndices};
pub use thermal::{
    dn_to_kelvin, kelvin_to_celsius, lst_celsius, lst_kelvin, thermal_plausibility, KELVIN_OFFSET,
    LST_OFFSET, LST_SCALE,
};
