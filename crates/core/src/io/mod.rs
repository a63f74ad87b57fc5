//! I/O for Landsat band stacks and analysis outputs
//!
//! Reading yields a [`BandStack`](crate::BandStack) with one described band per
//! sample; writing emits single-band GeoTIFFs for residual and classification
//! rasters.

mod metadata;
mod native;

pub use metadata::parse_band_descriptions;
pub use native::{
    read_band_stack, read_band_stack_from_buffer, write_classification, write_geotiff,
    write_geotiff_to_buffer, GeoTiffOptions,
};
