//! Scoring of partitioned regions

use super::gradient::{continuity, gradient_magnitude, mean_boundary_gradient};
use super::impact::{driver_weight, impact_score, ImpactParams};
use super::severity::{mean, median, severity_score};
use super::tables::{FeatureRecord, ImpactRecord, SeverityRecord};
use crate::anomaly::ResidualFit;
use crate::maybe_rayon::*;
use crate::morphology::{Region, Zone, ZonePartition};
use ndarray::Array2;
use thermanom_core::{Raster, Result};

/// Scored tables of one run
#[derive(Debug, Clone)]
pub struct ScoreTables {
    /// Sorted by region id, then row-major
    pub impacts: Vec<ImpactRecord>,
    /// Sorted by region id
    pub severities: Vec<SeverityRecord>,
    /// Same order as `impacts`
    pub features: Vec<FeatureRecord>,
    /// Impact Score per pixel; NaN outside regions
    pub impact_raster: Raster<f64>,
}

/// Computes Impact Scores per pixel and Severity Scores per region
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    params: ImpactParams,
}

impl ScoringEngine {
    pub fn new(params: ImpactParams) -> Self {
        Self { params }
    }

    /// Score every region of `partition` against the fitted residual model.
    ///
    /// `dispersion` is the residual standard deviation used by the
    /// classifier.
    pub fn score(
        &self,
        partition: &ZonePartition,
        fit: &ResidualFit,
        lst_celsius: &Raster<f64>,
        dispersion: f64,
    ) -> Result<ScoreTables> {
        self.params.validate()?;
        let residuals = &fit.residuals;
        let gradient = gradient_magnitude(residuals)?;
        let weights = fit.importances.weights();

        let scored: Vec<(Vec<ImpactRecord>, SeverityRecord)> = partition
            .regions
            .par_iter()
            .map(|region| {
                let pixels = self.score_pixels(region, fit, &weights, dispersion);
                let severity = self.summarize(region, &pixels, fit, &gradient);
                (pixels, severity)
            })
            .collect();

        let (rows, cols) = residuals.shape();
        let mut impact_data = Array2::from_elem((rows, cols), f64::NAN);
        let mut impacts = Vec::new();
        let mut severities = Vec::with_capacity(scored.len());
        let mut features = Vec::new();

        for (pixels, severity) in scored {
            for p in &pixels {
                impact_data[(p.row, p.col)] = p.impact;
                let observed = lst_celsius.data()[(p.row, p.col)];
                let predicted = fit.predicted.data()[(p.row, p.col)];
                features.push(FeatureRecord::join(p, &severity, observed, predicted));
            }
            impacts.extend(pixels);
            severities.push(severity);
        }

        let mut impact_raster = residuals.derive(impact_data)?;
        impact_raster.set_nodata(Some(f64::NAN));

        tracing::info!(
            regions = severities.len(),
            pixels = impacts.len(),
            "scored anomaly regions"
        );

        Ok(ScoreTables {
            impacts,
            severities,
            features,
            impact_raster,
        })
    }

    fn score_pixels(
        &self,
        region: &Region,
        fit: &ResidualFit,
        weights: &[f64],
        dispersion: f64,
    ) -> Vec<ImpactRecord> {
        let transform = fit.residuals.transform();
        let sigma = dispersion.max(self.params.std_floor);
        let mut values = vec![0.0; fit.predictors.len()];

        region
            .pixels
            .iter()
            .map(|&(row, col)| {
                let residual = fit.residuals.data()[(row, col)];
                fit.predictors.sample_into(row, col, &mut values);
                let w = driver_weight(&values, &fit.predictor_moments, weights);
                let (x, y) = transform.pixel_to_geo(col, row);
                ImpactRecord {
                    region_id: region.id,
                    row,
                    col,
                    x,
                    y,
                    polarity: region.polarity,
                    zone: region.zone_of(row, col).unwrap_or(Zone::Eaz),
                    residual,
                    z_score: if residual.is_finite() { residual.abs() / sigma } else { 0.0 },
                    driver_weight: w,
                    impact: impact_score(residual, dispersion, w, &self.params),
                }
            })
            .collect()
    }

    fn summarize(
        &self,
        region: &Region,
        pixels: &[ImpactRecord],
        fit: &ResidualFit,
        gradient: &Raster<f64>,
    ) -> SeverityRecord {
        let transform = fit.residuals.transform();
        let impacts: Vec<f64> = pixels.iter().map(|p| p.impact).collect();
        let zone_mean = |zone: Zone| {
            let v: Vec<f64> = pixels.iter().filter(|p| p.zone == zone).map(|p| p.impact).collect();
            if v.is_empty() {
                None
            } else {
                Some(mean(&v))
            }
        };
        let residuals: Vec<f64> = pixels.iter().map(|p| p.residual).collect();

        let mean_impact = mean(&impacts);
        let compactness = region.compactness();
        let boundary = mean_boundary_gradient(&region.pixels, gradient);
        let (centroid_row, centroid_col) = region.centroid;
        let (centroid_x, centroid_y) = transform.fractional_to_geo(centroid_col + 0.5, centroid_row + 0.5);

        SeverityRecord {
            region_id: region.id,
            polarity: region.polarity,
            area_pixels: region.area(),
            area_m2: region.area() as f64 * transform.pixel_area(),
            core_pixels: region.core.len(),
            eaz_pixels: region.eaz.len(),
            perimeter: region.perimeter,
            compactness,
            mean_impact,
            max_impact: impacts.iter().copied().fold(0.0, f64::max),
            core_mean_impact: zone_mean(Zone::Core),
            eaz_mean_impact: zone_mean(Zone::Eaz),
            median_delta_t: median(&residuals),
            mean_boundary_gradient: boundary,
            continuity: continuity(boundary),
            centroid_row,
            centroid_col,
            centroid_x,
            centroid_y,
            min_row: region.bbox.min_row,
            min_col: region.bbox.min_col,
            max_row: region.bbox.max_row,
            max_col: region.bbox.max_col,
            severity: severity_score(mean_impact, region.area(), compactness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{fast_config, make_scene};
    use crate::pipeline::ThermalAnomalyPipeline;
    use crate::morphology::Polarity;

    #[test]
    fn test_tables_are_keyed_and_ordered() {
        let stack = make_scene(30, 30, Some((5, 5, 6)), 20.0 / 0.00341802);
        let result = ThermalAnomalyPipeline::new(fast_config()).unwrap().run(&stack).unwrap();
        let tables = &result.scores;

        let severity = &tables.severities[0];
        assert_eq!(severity.region_id, 1);
        assert_eq!(severity.polarity, Polarity::Hot);
        assert_eq!(severity.area_pixels, 36);
        assert_eq!(severity.core_pixels + severity.eaz_pixels, 36);
        assert!((severity.area_m2 - 36.0 * 900.0).abs() < 1e-9);
        assert_eq!((severity.min_row, severity.min_col), (5, 5));
        assert_eq!((severity.max_row, severity.max_col), (10, 10));
        assert!((severity.centroid_row - 7.5).abs() < 1e-12);
        // Centroid (7.5, 7.5) → cell center at 8.0 pixels from the origin
        assert!((severity.centroid_x - (500_000.0 + 8.0 * 30.0)).abs() < 1e-6);
        assert!((severity.centroid_y - (4_000_000.0 - 8.0 * 30.0)).abs() < 1e-6);
        assert!(severity.core_mean_impact.is_some());
        assert!(severity.median_delta_t > 15.0);
        assert!(severity.continuity > 0.0 && severity.continuity <= 1.0);

        let keys: Vec<(usize, usize)> = tables.impacts.iter().map(|p| (p.row, p.col)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        for (pixel, feature) in tables.impacts.iter().zip(&tables.features) {
            assert_eq!((pixel.row, pixel.col), (feature.row, feature.col));
            assert!(pixel.impact > 0.0 && pixel.impact <= 100.0);
            assert_eq!(feature.region_severity, severity.severity);
            assert!((feature.lst_celsius - feature.lst_predicted - pixel.residual).abs() < 1e-9);
        }
    }

    #[test]
    fn test_impact_raster_covers_regions_only() {
        let stack = make_scene(30, 30, Some((10, 10, 5)), 20.0 / 0.00341802);
        let result = ThermalAnomalyPipeline::new(fast_config()).unwrap().run(&stack).unwrap();
        let raster = &result.scores.impact_raster;

        assert!(raster.get(0, 0).unwrap().is_nan());
        assert!(raster.get(12, 12).unwrap() > 0.0);
        let scored = raster.data().iter().filter(|v| v.is_finite()).count();
        assert_eq!(scored, result.scores.impacts.len());
    }
}
