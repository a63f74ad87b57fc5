//! Per-region Severity Score
//!
//! `severity = mean_impact · ln(1 + area_pixels) · (0.5 + 0.5 · compactness)`
//!
//! Each factor is non-negative and non-decreasing in its input, so raising
//! mean impact, area or compactness with the others fixed never lowers the
//! score. Compactness only modulates by up to a factor of two.

/// Severity of a region
pub fn severity_score(mean_impact: f64, area_pixels: usize, compactness: f64) -> f64 {
    let impact = if mean_impact.is_finite() { mean_impact.max(0.0) } else { 0.0 };
    let shape = 0.5 + 0.5 * compactness.clamp(0.0, 1.0);
    impact * (1.0 + area_pixels as f64).ln() * shape
}

/// Median of the finite values, or NaN if there are none
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Mean of the finite values, or 0 if there are none
pub fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}
