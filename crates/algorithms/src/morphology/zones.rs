//! Region extraction and Core/EAZ zone partition
//!
//! Per polarity: agglutinate the anomaly mask by dilation, label the
//! agglutinated components, group the flagged pixels by component, drop
//! groups below the size floor, and split each survivor into an eroded
//! Core and the surrounding EAZ.

use super::dilate::dilate_mask;
use super::element::StructuringElement;
use super::erode::erode_mask_iter;
use super::label::{label_components, Connectivity};
use super::region::{BoundingBox, Polarity, Region, Zone};
use crate::anomaly::AnomalyMasks;
use crate::maybe_rayon::*;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thermanom_core::{Algorithm, Error, Mask, Raster, Result};

/// Parameters for the spatial morphology stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialParams {
    /// Fewest flagged pixels a region may have (default: 1)
    pub min_anomaly_size: usize,
    /// Disk radius used to merge nearby blobs, 0 disables (default: 4)
    pub agglutination_distance: usize,
    /// Erosion passes separating Core from EAZ (default: 1)
    pub core_erosion_depth: usize,
    /// Component adjacency (default: 8-connected)
    pub connectivity: Connectivity,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            min_anomaly_size: 1,
            agglutination_distance: 4,
            core_erosion_depth: 1,
            connectivity: Connectivity::Eight,
        }
    }
}

impl SpatialParams {
    pub fn validate(&self) -> Result<()> {
        if self.core_erosion_depth == 0 {
            return Err(Error::InvalidParameter {
                name: "core_erosion_depth",
                value: "0".to_string(),
                reason: "the core needs at least one erosion pass".to_string(),
            });
        }
        Ok(())
    }

    /// Unit element matching the connectivity
    fn erosion_element(&self) -> StructuringElement {
        match self.connectivity {
            Connectivity::Four => StructuringElement::Cross(1),
            Connectivity::Eight => StructuringElement::Square(1),
        }
    }
}

/// Regions of one run and their classification raster
#[derive(Debug, Clone)]
pub struct ZonePartition {
    /// Hot regions first, then cold; ids are 1-based and sequential
    pub regions: Vec<Region>,
    /// Codes 0-4 per [`super::ZoneClass`]
    pub classification: Raster<u8>,
}

impl ZonePartition {
    pub fn count(&self, polarity: Polarity) -> usize {
        self.regions.iter().filter(|r| r.polarity == polarity).count()
    }

    pub fn region(&self, id: u32) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }
}

/// Spatial morphology stage
#[derive(Debug, Clone, Default)]
pub struct SpatialMorphology;

impl Algorithm for SpatialMorphology {
    type Input = AnomalyMasks;
    type Output = ZonePartition;
    type Params = SpatialParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpatialMorphology"
    }

    fn description(&self) -> &'static str {
        "Agglutinate, label and size-filter anomaly masks, then split regions into Core and EAZ"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        partition_zones(&input.hot, &input.cold, &params)
    }
}

/// Build hot and cold regions and the classification raster.
///
/// Agglutination only decides which flagged pixels share a region: masks
/// are dilated by `agglutination_distance` for labeling, but pixels added by
/// the dilation never join a region, so region footprints are exactly the
/// flagged pixels. No closing or opening reshapes them.
///
/// Hot takes precedence: pixels claimed by a hot region are removed from the
/// cold mask before cold regions are built.
pub fn partition_zones(hot: &Mask, cold: &Mask, params: &SpatialParams) -> Result<ZonePartition> {
    params.validate()?;
    if hot.shape() != cold.shape() {
        let (er, ec) = hot.shape();
        let (ar, ac) = cold.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    let (rows, cols) = hot.shape();

    let hot_regions = extract_regions(hot, Polarity::Hot, params)?;

    let mut claimed = Mask::new(rows, cols);
    for region in &hot_regions {
        for &(r, c) in &region.pixels {
            claimed.set(r, c, true)?;
        }
    }
    let cold_regions = extract_regions(&cold.difference(&claimed)?, Polarity::Cold, params)?;

    let mut regions = hot_regions;
    regions.extend(cold_regions);
    for (i, region) in regions.iter_mut().enumerate() {
        region.id = (i + 1) as u32;
    }

    // Cold first so hot wins any shared cell
    let mut classes = Array2::<u8>::zeros((rows, cols));
    for polarity in [Polarity::Cold, Polarity::Hot] {
        for region in regions.iter().filter(|r| r.polarity == polarity) {
            for &(r, c) in &region.eaz {
                classes[(r, c)] = region.class_of(Zone::Eaz).code();
            }
            for &(r, c) in &region.core {
                classes[(r, c)] = region.class_of(Zone::Core).code();
            }
        }
    }

    tracing::info!(
        hot = regions.iter().filter(|r| r.polarity == Polarity::Hot).count(),
        cold = regions.iter().filter(|r| r.polarity == Polarity::Cold).count(),
        "partitioned anomaly regions"
    );

    Ok(ZonePartition {
        regions,
        classification: Raster::from_array(classes),
    })
}

fn extract_regions(mask: &Mask, polarity: Polarity, params: &SpatialParams) -> Result<Vec<Region>> {
    if mask.is_clear() {
        return Ok(Vec::new());
    }

    let agglutinated = if params.agglutination_distance > 0 {
        dilate_mask(mask, &StructuringElement::Disk(params.agglutination_distance))?
    } else {
        mask.clone()
    };
    let labels = label_components(&agglutinated, params.connectivity);

    let mut groups: Vec<Vec<(usize, usize)>> = vec![Vec::new(); labels.count];
    for (r, c) in mask.cells() {
        let label = labels.get(r, c) as usize;
        if label > 0 {
            groups[label - 1].push((r, c));
        }
    }

    let min_size = params.min_anomaly_size.max(1);
    let dropped = groups.iter().filter(|g| !g.is_empty() && g.len() < min_size).count();
    if dropped > 0 {
        tracing::debug!(%polarity, dropped, min_size, "discarded undersized components");
    }

    let element = params.erosion_element();
    groups
        .into_par_iter()
        .filter(|g| g.len() >= min_size)
        .map(|pixels| describe_region(pixels, polarity, &element, params.core_erosion_depth))
        .collect()
}

fn describe_region(
    pixels: Vec<(usize, usize)>,
    polarity: Polarity,
    element: &StructuringElement,
    depth: usize,
) -> Result<Region> {
    let mut bbox = BoundingBox {
        min_row: usize::MAX,
        min_col: usize::MAX,
        max_row: 0,
        max_col: 0,
    };
    let (mut sum_r, mut sum_c) = (0.0, 0.0);
    for &(r, c) in &pixels {
        bbox.min_row = bbox.min_row.min(r);
        bbox.min_col = bbox.min_col.min(c);
        bbox.max_row = bbox.max_row.max(r);
        bbox.max_col = bbox.max_col.max(c);
        sum_r += r as f64;
        sum_c += c as f64;
    }
    let n = pixels.len() as f64;

    // Work in the bounding box; cells outside it are outside the region
    let local_cells: Vec<(usize, usize)> = pixels
        .iter()
        .map(|&(r, c)| (r - bbox.min_row, c - bbox.min_col))
        .collect();
    let local = Mask::from_cells(bbox.height(), bbox.width(), &local_cells)?;
    let core_local = erode_mask_iter(&local, element, depth)?;

    let mut core = Vec::new();
    let mut eaz = Vec::new();
    let mut perimeter = 0;
    for (&(r, c), &(lr, lc)) in pixels.iter().zip(&local_cells) {
        if core_local.get(lr, lc) {
            core.push((r, c));
        } else {
            eaz.push((r, c));
        }
        let (lr, lc) = (lr as isize, lc as isize);
        perimeter += [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .iter()
            .filter(|&&(dr, dc)| !local.get_signed(lr + dr, lc + dc))
            .count();
    }

    Ok(Region {
        id: 0,
        polarity,
        pixels,
        core,
        eaz,
        centroid: (sum_r / n, sum_c / n),
        bbox,
        perimeter,
    })
}
