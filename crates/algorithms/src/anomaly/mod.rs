//! Residual-based anomaly detection
//!
//! - **Residual model**: random forest baseline of LST from land cover
//! - **Classifier**: hot/cold masks at ±k residual standard deviations

mod classifier;
mod residual;

pub use classifier::{
    classify_residuals, residual_dispersion, AnomalyClassifier, AnomalyMasks, ClassifierParams,
    MIN_DISPERSION,
};
pub use residual::{
    percentile, population_std, r_squared, FeatureImportances, ModelSummary, Predictors, ResidualFit,
    ResidualModel, ResidualParams,
};
