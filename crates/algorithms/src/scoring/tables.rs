//! Output table rows
//!
//! Plain serde records keyed by pixel coordinate and region id, ready for
//! CSV or JSON serialization.

use crate::morphology::{Polarity, Zone};
use serde::Serialize;

/// One anomalous pixel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRecord {
    pub region_id: u32,
    pub row: usize,
    pub col: usize,
    /// Map x of the pixel center
    pub x: f64,
    /// Map y of the pixel center
    pub y: f64,
    pub polarity: Polarity,
    pub zone: Zone,
    /// Observed minus predicted LST (°C)
    pub residual: f64,
    /// `|residual| / max(σ, std_floor)`
    pub z_score: f64,
    pub driver_weight: f64,
    pub impact: f64,
}

/// One anomaly region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityRecord {
    pub region_id: u32,
    pub polarity: Polarity,
    pub area_pixels: usize,
    pub area_m2: f64,
    pub core_pixels: usize,
    pub eaz_pixels: usize,
    pub perimeter: usize,
    pub compactness: f64,
    pub mean_impact: f64,
    pub max_impact: f64,
    /// None when the region has no Core
    pub core_mean_impact: Option<f64>,
    /// None when the region is all Core
    pub eaz_mean_impact: Option<f64>,
    pub median_delta_t: f64,
    pub mean_boundary_gradient: f64,
    pub continuity: f64,
    pub centroid_row: f64,
    pub centroid_col: f64,
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
    pub severity: f64,
}

/// Pixel row joined with its region's attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub region_id: u32,
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub polarity: Polarity,
    pub zone: Zone,
    pub lst_celsius: f64,
    pub lst_predicted: f64,
    pub residual: f64,
    pub z_score: f64,
    pub driver_weight: f64,
    pub impact: f64,
    pub region_area_pixels: usize,
    pub region_compactness: f64,
    pub region_continuity: f64,
    pub region_median_delta_t: f64,
    pub region_severity: f64,
}

impl FeatureRecord {
    pub fn join(pixel: &ImpactRecord, region: &SeverityRecord, lst_celsius: f64, lst_predicted: f64) -> Self {
        Self {
            region_id: pixel.region_id,
            row: pixel.row,
            col: pixel.col,
            x: pixel.x,
            y: pixel.y,
            polarity: pixel.polarity,
            zone: pixel.zone,
            lst_celsius,
            lst_predicted,
            residual: pixel.residual,
            z_score: pixel.z_score,
            driver_weight: pixel.driver_weight,
            impact: pixel.impact,
            region_area_pixels: region.area_pixels,
            region_compactness: region.compactness,
            region_continuity: region.continuity,
            region_median_delta_t: region.median_delta_t,
            region_severity: region.severity,
        }
    }
}
