//! Residual thresholding into hot and cold anomaly masks

use super::residual::population_std;
use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use thermanom_core::{Algorithm, Error, Mask, Raster, Result};

/// Dispersion below which a residual field is treated as flat
pub const MIN_DISPERSION: f64 = 1e-6;

/// Parameters for the anomaly classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Multiple of the residual standard deviation (default: 1.5)
    pub k_threshold: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self { k_threshold: 1.5 }
    }
}

impl ClassifierParams {
    pub fn validate(&self) -> Result<()> {
        if !self.k_threshold.is_finite() || self.k_threshold < 0.0 {
            return Err(Error::InvalidParameter {
                name: "k_threshold",
                value: self.k_threshold.to_string(),
                reason: "must be a finite, non-negative multiple of the dispersion".to_string(),
            });
        }
        Ok(())
    }
}

/// Hot and cold anomaly masks with the threshold that produced them
#[derive(Debug, Clone)]
pub struct AnomalyMasks {
    pub hot: Mask,
    pub cold: Mask,
    /// Population standard deviation of valid residuals
    pub dispersion: f64,
    /// `k_threshold × dispersion`
    pub threshold: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnomalyMasks {
    pub fn flagged(&self) -> usize {
        self.hot.count() + self.cold.count()
    }
}

/// Anomaly classification stage
#[derive(Debug, Clone, Default)]
pub struct AnomalyClassifier;

impl Algorithm for AnomalyClassifier {
    type Input = Raster<f64>;
    type Output = AnomalyMasks;
    type Params = ClassifierParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "AnomalyClassifier"
    }

    fn description(&self) -> &'static str {
        "Threshold residuals at ±k standard deviations into hot and cold masks"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        classify_residuals(&input, &params)
    }
}

/// Standard deviation of the finite residuals, or None if there are none
pub fn residual_dispersion(residuals: &Raster<f64>) -> Option<f64> {
    let values: Vec<f64> = residuals.data().iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        None
    } else {
        Some(population_std(&values))
    }
}

/// Split residuals into hot (`r > kσ`) and cold (`r < -kσ`) masks.
///
/// Non-finite residuals are never flagged. A degenerate dispersion yields
/// two empty masks and a diagnostic instead of an error.
pub fn classify_residuals(residuals: &Raster<f64>, params: &ClassifierParams) -> Result<AnomalyMasks> {
    params.validate()?;
    let (rows, cols) = residuals.shape();

    let dispersion = residual_dispersion(residuals).unwrap_or(0.0);
    if dispersion < MIN_DISPERSION {
        return Ok(AnomalyMasks {
            hot: Mask::new(rows, cols),
            cold: Mask::new(rows, cols),
            dispersion,
            threshold: params.k_threshold * dispersion,
            diagnostics: vec![Diagnostic::DegenerateDispersion { dispersion }.emit()],
        });
    }

    let threshold = params.k_threshold * dispersion;
    let hot = Mask::from_array(residuals.data().mapv(|r| r > threshold));
    let cold = Mask::from_array(residuals.data().mapv(|r| r < -threshold));

    tracing::info!(
        dispersion,
        threshold,
        hot = hot.count(),
        cold = cold.count(),
        "classified residuals"
    );

    Ok(AnomalyMasks {
        hot,
        cold,
        dispersion,
        threshold,
        diagnostics: Vec::new(),
    })
}
