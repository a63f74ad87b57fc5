//! Spatial morphology engine
//!
//! Binary morphology over anomaly masks:
//! - **Dilation**: agglutinates nearby anomalous blobs
//! - **Erosion**: peels the EAZ off each region to expose its Core
//! - **Labeling**: 4- or 8-connected components
//! - **Zones**: regions, size filtering and the classification raster

mod dilate;
mod element;
mod erode;
mod label;
mod region;
mod zones;

pub use dilate::dilate_mask;
pub use element::StructuringElement;
pub use erode::{erode_mask, erode_mask_iter};
pub use label::{label_components, Connectivity, Labels};
pub use region::{BoundingBox, Polarity, Region, Zone, ZoneClass};
pub use zones::{partition_zones, SpatialMorphology, SpatialParams, ZonePartition};
