//! # Thermanom Algorithms
//!
//! Thermal land-surface anomaly detection for Landsat Collection 2 Level-2
//! scenes.
//!
//! ## Stages
//!
//! - **bands**: Semantic band mapping, resolution by description, QA masking
//! - **imagery**: NDVI, NDWI, NDBI, NDBSI and LST conversion
//! - **regression**: Random forest regressor
//! - **anomaly**: Scene-local LST residual model and hot/cold thresholding
//! - **morphology**: Dilation, erosion, component labeling, Core/EAZ zones
//! - **scoring**: Impact and Severity Scores
//! - **pipeline**: All of the above in sequence

pub mod anomaly;
pub mod bands;
pub mod diagnostics;
pub mod imagery;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod pipeline;
pub mod regression;
pub mod scoring;

pub use diagnostics::Diagnostic;
pub use pipeline::{AnalysisResult, PipelineConfig, ThermalAnomalyPipeline};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::anomaly::{
        classify_residuals, AnomalyClassifier, AnomalyMasks, ClassifierParams, ResidualFit,
        ResidualModel, ResidualParams,
    };
    pub use crate::bands::{qa_valid_mask, BandMapping, BandName, BandResolver, BandSet, QaParams};
    pub use crate::diagnostics::Diagnostic;
    pub use crate::imagery::{ndbi, ndbsi, ndvi, ndwi, IndexStack, SpectralIndex, SpectralIndices};
    pub use crate::morphology::{
        partition_zones, Connectivity, Polarity, Region, SpatialMorphology, SpatialParams, Zone,
        ZoneClass, ZonePartition,
    };
    pub use crate::pipeline::{AnalysisResult, PipelineConfig, ThermalAnomalyPipeline};
    pub use crate::regression::{ForestParams, MaxFeatures, RandomForest};
    pub use crate::scoring::{
        FeatureRecord, ImpactParams, ImpactRecord, ScoreTables, ScoringEngine, SeverityRecord,
    };
    pub use thermanom_core::prelude::*;
}
