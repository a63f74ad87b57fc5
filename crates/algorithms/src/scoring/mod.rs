//! Scoring engine
//!
//! - **Impact Score**: per-pixel residual magnitude weighted by how strongly
//!   the pixel departs from the scene in the model's most important predictors
//! - **Severity Score**: per-region aggregate of impact, area and compactness
//! - Boundary gradient, continuity and median ΔT as supporting region metrics

mod engine;
mod gradient;
mod impact;
mod severity;
mod tables;

pub use engine::{ScoreTables, ScoringEngine};
pub use gradient::{boundary_cells, continuity, gradient_magnitude, mean_boundary_gradient};
pub use impact::{driver_weight, impact_score, ImpactParams, IMPACT_MAX};
pub use severity::{mean, median, severity_score};
pub use tables::{FeatureRecord, ImpactRecord, SeverityRecord};
