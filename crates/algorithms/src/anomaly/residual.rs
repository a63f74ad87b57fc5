//! Scene-local LST residual model
//!
//! A random forest learns the scene's own relationship between land cover
//! (spectral indices and reflectance) and surface temperature. Residuals
//! against that baseline expose pixels hotter or colder than their land
//! cover explains.

use crate::bands::{BandName, BandSet};
use crate::imagery::{IndexStack, SpectralIndex};
use crate::regression::{FeatureMatrix, ForestParams, RandomForest};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thermanom_core::{Error, Mask, Raster, Result};

/// Parameters for the residual model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualParams {
    /// Add the six reflectance bands to the four indices as predictors
    pub include_reflectance: bool,
    /// Fewest pixels the model may be fitted on, after trimming
    pub min_training_pixels: usize,
    /// LST percentiles (low, high) bounding the training set; pixels
    /// strictly outside are predicted but not trained on. `None` trains on
    /// every valid pixel.
    pub exclude_percentiles: Option<(f64, f64)>,
}

impl Default for ResidualParams {
    fn default() -> Self {
        Self {
            include_reflectance: true,
            min_training_pixels: 50,
            exclude_percentiles: Some((2.0, 98.0)),
        }
    }
}

impl ResidualParams {
    pub fn validate(&self) -> Result<()> {
        if let Some((lo, hi)) = self.exclude_percentiles {
            if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo >= hi {
                return Err(Error::InvalidParameter {
                    name: "exclude_percentiles",
                    value: format!("({}, {})", lo, hi),
                    reason: "must satisfy 0 <= low < high <= 100".into(),
                });
            }
        }
        Ok(())
    }
}

/// Predictor layers in model column order
#[derive(Debug, Clone)]
pub struct Predictors {
    names: Vec<String>,
    layers: Vec<Raster<f64>>,
}

impl Predictors {
    /// Collect the index layers, then optionally the reflectance bands
    pub fn gather(indices: &IndexStack, bands: &BandSet, include_reflectance: bool) -> Result<Self> {
        let mut names = Vec::new();
        let mut layers = Vec::new();
        for index in SpectralIndex::PREDICTORS {
            names.push(index.name().to_string());
            layers.push(indices.get(index).clone());
        }
        if include_reflectance {
            for band in BandName::REFLECTANCE {
                names.push(band.as_str().to_string());
                layers.push(bands.require(band)?.clone());
            }
        }
        Ok(Self { names, layers })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Value of predictor `feature` at (row, col)
    #[inline]
    pub fn value(&self, feature: usize, row: usize, col: usize) -> f64 {
        self.layers[feature].data()[(row, col)]
    }

    /// Fill `out` with every predictor at (row, col); false if any is not finite
    pub fn sample_into(&self, row: usize, col: usize, out: &mut [f64]) -> bool {
        let mut finite = true;
        for (slot, layer) in out.iter_mut().zip(&self.layers) {
            let v = layer.data()[(row, col)];
            finite &= v.is_finite() && !layer.is_nodata(v);
            *slot = v;
        }
        finite
    }
}

/// Impurity-based importance of each predictor, summing to 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportances {
    entries: Vec<(String, f64)>,
}

impl FeatureImportances {
    pub fn new(names: &[String], weights: &[f64]) -> Self {
        Self {
            entries: names.iter().cloned().zip(weights.iter().copied()).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, w)| *w)
    }

    /// Weights in predictor column order
    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, w)| (n.as_str(), *w))
    }

    /// Entries sorted by descending weight
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Fit statistics of the residual model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    /// In-sample coefficient of determination
    pub r2: f64,
    /// Population standard deviation of training residuals (°C)
    pub residual_std: f64,
    /// Pixels the model was fitted on
    pub n_train: usize,
    /// Valid pixels left out of training by the LST percentile trim
    pub n_excluded: usize,
    pub n_trees: usize,
    pub seed: u64,
}

/// Outcome of fitting the residual model on one scene
#[derive(Debug, Clone)]
pub struct ResidualFit {
    /// Observed minus predicted LST (°C); NaN where invalid
    pub residuals: Raster<f64>,
    /// Predicted LST (°C); NaN where invalid
    pub predicted: Raster<f64>,
    /// Pixels used for training and scoring
    pub valid: Mask,
    pub predictors: Predictors,
    /// Per-predictor (mean, std) over valid pixels
    pub predictor_moments: Vec<(f64, f64)>,
    pub importances: FeatureImportances,
    pub summary: ModelSummary,
    pub forest: RandomForest,
}

/// Fits the scene baseline and derives residuals
#[derive(Debug, Clone, Default)]
pub struct ResidualModel {
    params: ResidualParams,
    forest_params: ForestParams,
}

impl ResidualModel {
    pub fn new(params: ResidualParams, forest_params: ForestParams) -> Self {
        Self {
            params,
            forest_params,
        }
    }

    /// Fit the baseline and compute residuals on every valid pixel.
    ///
    /// A pixel is valid when `qa_valid` allows it and its LST and every
    /// predictor are finite. Valid pixels whose LST falls strictly outside
    /// the `exclude_percentiles` range are kept out of training, so the
    /// anomalies being searched for do not shape the baseline.
    pub fn fit(&self, indices: &IndexStack, bands: &BandSet, qa_valid: &Mask) -> Result<ResidualFit> {
        self.params.validate()?;
        self.forest_params.validate()?;
        let (rows, cols) = indices.shape();
        if qa_valid.shape() != (rows, cols) {
            let (ar, ac) = qa_valid.shape();
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar,
                ac,
            });
        }

        let predictors = Predictors::gather(indices, bands, self.params.include_reflectance)?;
        let lst = indices.lst_celsius();

        let mut valid = Mask::new(rows, cols);
        let mut cells = Vec::new();
        let mut x = FeatureMatrix::new(predictors.names().iter().cloned());
        let mut y = Vec::new();
        let mut buf = vec![0.0; predictors.len()];

        for row in 0..rows {
            for col in 0..cols {
                if !qa_valid.get(row, col) {
                    continue;
                }
                let t = unsafe { lst.get_unchecked(row, col) };
                if !t.is_finite() || !predictors.sample_into(row, col, &mut buf) {
                    continue;
                }
                x.push_row(&buf)?;
                y.push(t);
                cells.push((row, col));
                valid.set(row, col, true)?;
            }
        }

        let n_valid = cells.len();
        let keep: Vec<bool> = match self.params.exclude_percentiles {
            Some((lo, hi)) if n_valid > 0 => {
                let mut sorted = y.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let (p_lo, p_hi) = (percentile(&sorted, lo), percentile(&sorted, hi));
                tracing::debug!(p_lo, p_hi, "training LST bounds");
                y.iter().map(|&t| t >= p_lo && t <= p_hi).collect()
            }
            _ => vec![true; n_valid],
        };

        let mut x_train = FeatureMatrix::with_capacity(predictors.names().iter().cloned(), n_valid);
        let mut y_train = Vec::with_capacity(n_valid);
        for i in (0..n_valid).filter(|&i| keep[i]) {
            x_train.push_row(x.row(i))?;
            y_train.push(y[i]);
        }
        let n_train = y_train.len();
        let n_excluded = n_valid - n_train;

        let required = self.params.min_training_pixels.max(1);
        if n_train < required {
            return Err(Error::InsufficientData {
                valid: n_train,
                required,
            });
        }
        tracing::info!(
            valid = n_valid,
            train = n_train,
            excluded = n_excluded,
            total = rows * cols,
            "training pixels after QA masking"
        );

        let forest = RandomForest::fit(&x_train, &y_train, &self.forest_params)?;
        let fitted = forest.predict(&x);

        let mut residual_data = Array2::from_elem((rows, cols), f64::NAN);
        let mut predicted_data = Array2::from_elem((rows, cols), f64::NAN);
        let mut train_fitted = Vec::with_capacity(n_train);
        let mut train_residuals = Vec::with_capacity(n_train);
        for (i, &(row, col)) in cells.iter().enumerate() {
            let r = y[i] - fitted[i];
            residual_data[(row, col)] = r;
            predicted_data[(row, col)] = fitted[i];
            if keep[i] {
                train_fitted.push(fitted[i]);
                train_residuals.push(r);
            }
        }

        let summary = ModelSummary {
            r2: r_squared(&y_train, &train_fitted),
            residual_std: population_std(&train_residuals),
            n_train,
            n_excluded,
            n_trees: forest.n_trees(),
            seed: forest.seed(),
        };
        tracing::info!(
            r2 = summary.r2,
            residual_std = summary.residual_std,
            trees = summary.n_trees,
            "residual model fitted"
        );

        let mut residuals = lst.derive(residual_data)?;
        residuals.set_nodata(Some(f64::NAN));
        let mut predicted = lst.derive(predicted_data)?;
        predicted.set_nodata(Some(f64::NAN));

        let importances = FeatureImportances::new(predictors.names(), forest.feature_importances());
        for (name, weight) in importances.ranked() {
            tracing::debug!(feature = name, weight, "feature importance");
        }

        Ok(ResidualFit {
            residuals,
            predicted,
            valid,
            predictor_moments: x.column_moments(),
            predictors,
            importances,
            summary,
            forest,
        })
    }
}

/// `1 - SS_res / SS_tot`; a constant target scores 1 when fitted exactly
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len();
    if n == 0 {
        return f64::NAN;
    }
    let mean = observed.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = observed.iter().map(|v| (v - mean) * (v - mean)).sum();
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Percentile `q` (0-100) of ascending `sorted`, interpolating linearly
/// between the two nearest ranks
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Two-pass population standard deviation
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::BandResolver;
    use crate::regression::MaxFeatures;
    use thermanom_core::BandStack;

    /// Vegetated left half (cool), built-up right half (warm)
    fn make_scene(rows: usize, cols: usize) -> BandSet {
        let mut stack = BandStack::new();
        let band = |veg: f64, urban: f64| {
            let mut r = Raster::new(rows, cols);
            for row in 0..rows {
                for col in 0..cols {
                    r.set(row, col, if col < cols / 2 { veg } else { urban }).unwrap();
                }
            }
            r
        };
        stack.push("SR_B2", band(0.03, 0.10)).unwrap();
        stack.push("SR_B3", band(0.06, 0.12)).unwrap();
        stack.push("SR_B4", band(0.04, 0.14)).unwrap();
        stack.push("SR_B5", band(0.45, 0.20)).unwrap();
        stack.push("SR_B6", band(0.18, 0.28)).unwrap();
        stack.push("SR_B7", band(0.09, 0.22)).unwrap();
        // ~295 K vs ~310 K
        stack.push("ST_B10", band(42700.0, 47100.0)).unwrap();
        stack.push("QA_PIXEL", Raster::filled(rows, cols, 21824.0)).unwrap();
        BandResolver::landsat89().resolve(&stack).unwrap()
    }

    fn small_forest() -> ForestParams {
        ForestParams {
            n_estimators: 10,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            max_samples: None,
            random_seed: Some(1),
        }
    }

    #[test]
    fn test_land_cover_explains_temperature() {
        let bands = make_scene(10, 10);
        let indices = IndexStack::compute(&bands).unwrap();
        let model = ResidualModel::new(ResidualParams::default(), small_forest());
        let fit = model.fit(&indices, &bands, &Mask::filled(10, 10, true)).unwrap();

        assert_eq!(fit.summary.n_train, 100);
        assert!(fit.summary.r2 > 0.99, "R2 {}", fit.summary.r2);
        let r = fit.residuals.get(5, 2).unwrap();
        assert!(r.abs() < 1e-6, "residual {}", r);
        assert!((fit.importances.weights().iter().sum::<f64>() - 1.0).abs() < 1e-10);
        assert_eq!(fit.predictors.len(), 10);
    }

    #[test]
    fn test_masked_pixels_carry_nan() {
        let bands = make_scene(10, 10);
        let indices = IndexStack::compute(&bands).unwrap();
        let mut qa = Mask::filled(10, 10, true);
        qa.set(0, 0, false).unwrap();

        let fit = ResidualModel::new(ResidualParams::default(), small_forest())
            .fit(&indices, &bands, &qa)
            .unwrap();
        assert!(fit.residuals.get(0, 0).unwrap().is_nan());
        assert!(fit.predicted.get(0, 0).unwrap().is_nan());
        assert!(!fit.valid.get(0, 0));
        assert_eq!(fit.summary.n_train, 99);
    }

    #[test]
    fn test_insufficient_data() {
        let bands = make_scene(10, 10);
        let indices = IndexStack::compute(&bands).unwrap();
        let qa = Mask::from_cells(10, 10, &[(1, 1), (2, 2), (3, 3)]).unwrap();

        match ResidualModel::default().fit(&indices, &bands, &qa) {
            Err(Error::InsufficientData { valid, required }) => {
                assert_eq!(valid, 3);
                assert_eq!(required, 50);
            }
            other => panic!("Expected InsufficientData, got {:?}", other.map(|f| f.summary)),
        }
    }

    #[test]
    fn test_indices_only_predictors() {
        let bands = make_scene(8, 8);
        let indices = IndexStack::compute(&bands).unwrap();
        let params = ResidualParams {
            include_reflectance: false,
            min_training_pixels: 10,
            ..ResidualParams::default()
        };
        let fit = ResidualModel::new(params, small_forest())
            .fit(&indices, &bands, &Mask::filled(8, 8, true))
            .unwrap();
        assert_eq!(fit.predictors.names(), &["ndvi", "ndwi", "ndbi", "ndbsi"]);
        assert!(fit.importances.get("ndvi").is_some());
        assert!(fit.importances.get("red").is_none());
    }

    /// Uniform vegetation with one pixel 15 K warmer and a distinct SWIR
    fn make_outlier_scene() -> BandSet {
        let mut stack = BandStack::new();
        let band = |value: f64, outlier: f64| {
            let mut r = Raster::filled(10, 10, value);
            r.set(4, 4, outlier).unwrap();
            r
        };
        stack.push("SR_B2", band(0.03, 0.03)).unwrap();
        stack.push("SR_B3", band(0.06, 0.06)).unwrap();
        stack.push("SR_B4", band(0.04, 0.04)).unwrap();
        stack.push("SR_B5", band(0.45, 0.45)).unwrap();
        stack.push("SR_B6", band(0.18, 0.40)).unwrap();
        stack.push("SR_B7", band(0.09, 0.09)).unwrap();
        stack.push("ST_B10", band(42700.0, 42700.0 + 15.0 / 0.00341802)).unwrap();
        stack.push("QA_PIXEL", Raster::filled(10, 10, 21824.0)).unwrap();
        BandResolver::landsat89().resolve(&stack).unwrap()
    }

    #[test]
    fn test_hot_outlier_stays_out_of_training() {
        let bands = make_outlier_scene();
        let indices = IndexStack::compute(&bands).unwrap();
        let qa = Mask::filled(10, 10, true);

        let trimmed = ResidualModel::new(ResidualParams::default(), small_forest())
            .fit(&indices, &bands, &qa)
            .unwrap();
        assert_eq!(trimmed.summary.n_train, 99);
        assert_eq!(trimmed.summary.n_excluded, 1);
        assert!(trimmed.valid.get(4, 4));
        let r = trimmed.residuals.get(4, 4).unwrap();
        assert!((r - 15.0).abs() < 1e-6, "residual {}", r);

        // Trained on, the outlier is absorbed by its own leaves
        let params = ResidualParams {
            exclude_percentiles: None,
            ..ResidualParams::default()
        };
        let untrimmed = ResidualModel::new(params, small_forest())
            .fit(&indices, &bands, &qa)
            .unwrap();
        assert_eq!(untrimmed.summary.n_train, 100);
        assert_eq!(untrimmed.summary.n_excluded, 0);
        assert!(untrimmed.residuals.get(4, 4).unwrap() < 14.0);
    }

    #[test]
    fn test_trim_applies_to_training_count() {
        let bands = make_outlier_scene();
        let indices = IndexStack::compute(&bands).unwrap();
        let params = ResidualParams {
            min_training_pixels: 100,
            ..ResidualParams::default()
        };

        match ResidualModel::new(params, small_forest()).fit(&indices, &bands, &Mask::filled(10, 10, true)) {
            Err(Error::InsufficientData { valid, required }) => {
                assert_eq!(valid, 99);
                assert_eq!(required, 100);
            }
            other => panic!("Expected InsufficientData, got {:?}", other.map(|f| f.summary)),
        }
    }

    #[test]
    fn test_invalid_percentiles_rejected() {
        let params = ResidualParams {
            exclude_percentiles: Some((98.0, 2.0)),
            ..ResidualParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter { name: "exclude_percentiles", .. })
        ));
        assert!(ResidualParams::default().validate().is_ok());
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 50.0), 3.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
        assert!((percentile(&sorted, 90.0) - 4.6).abs() < 1e-12);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_r_squared_and_std() {
        assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert!((population_std(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
