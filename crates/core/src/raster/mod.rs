//! Raster data structures

mod element;
mod geotransform;
mod grid;
mod mask;
mod neighborhood;
mod stack;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use mask::Mask;
pub use neighborhood::Neighborhood;
pub use stack::{BandStack, SourceBand};
