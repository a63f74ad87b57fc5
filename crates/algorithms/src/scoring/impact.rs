//! Per-pixel Impact Score
//!
//! ```text
//! z      = |residual| / max(σ, std_floor)
//! d_f    = |x_f - mean_f| / std_f          (0 when std_f = 0)
//! w      = Σ importance_f · d_f / (1 + d_f)  ∈ [0, 1)
//! impact = 100 · (1 - exp(-z · (1 + w) / impact_scale))
//! ```
//!
//! `w` is large when the pixel departs from the scene mean in the predictors
//! the model relies on most, so equal residuals score higher when they sit
//! on informative land-cover signals. Scores lie in [0, 100].

use serde::{Deserialize, Serialize};
use thermanom_core::{Error, Result};

/// Upper bound of the impact scale
pub const IMPACT_MAX: f64 = 100.0;

/// Parameters for Impact Score computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactParams {
    /// Lower bound on the residual dispersion in °C (default: 0.05)
    pub std_floor: f64,
    /// Weighted z at which the score reaches ~63 (default: 5.0)
    pub impact_scale: f64,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            std_floor: 0.05,
            impact_scale: 5.0,
        }
    }
}

impl ImpactParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("std_floor", self.std_floor), ("impact_scale", self.impact_scale)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "must be finite and positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Importance-weighted departure of a pixel's predictors from the scene mean
pub fn driver_weight(values: &[f64], moments: &[(f64, f64)], importances: &[f64]) -> f64 {
    values
        .iter()
        .zip(moments)
        .zip(importances)
        .map(|((&x, &(mean, std)), &w)| {
            if std.is_nan() || std <= 0.0 || !x.is_finite() {
                return 0.0;
            }
            let d = (x - mean).abs() / std;
            w * d / (1.0 + d)
        })
        .sum()
}

/// Impact Score of one residual
pub fn impact_score(residual: f64, dispersion: f64, driver_weight: f64, params: &ImpactParams) -> f64 {
    if !residual.is_finite() {
        return 0.0;
    }
    let sigma = if dispersion.is_finite() {
        dispersion.max(params.std_floor)
    } else {
        params.std_floor
    };
    let z = residual.abs() / sigma;
    let raw = z * (1.0 + driver_weight.max(0.0));
    IMPACT_MAX * (1.0 - (-raw / params.impact_scale).exp())
}
