//! End-to-end thermal anomaly analysis
//!
//! Stages run in strict sequence, each consuming the complete output of the
//! previous one:
//!
//! ```text
//! BandStack → BandSet → IndexStack → ResidualFit → AnomalyMasks → ZonePartition → ScoreTables
//! ```

use crate::anomaly::{classify_residuals, AnomalyMasks, ClassifierParams, ResidualFit, ResidualModel, ResidualParams};
use crate::bands::{qa_valid_mask, BandMapping, BandName, BandResolver, BandSet, QaParams};
use crate::diagnostics::Diagnostic;
use crate::imagery::IndexStack;
use crate::morphology::{partition_zones, Polarity, SpatialParams, ZonePartition};
use crate::regression::ForestParams;
use crate::scoring::{ImpactParams, ScoreTables, ScoringEngine};
use serde::{Deserialize, Serialize};
use thermanom_core::{BandStack, Mask, Raster, Result};

/// Configuration of a full analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Semantic name → band description; `None` uses the Landsat 8/9 table
    pub band_mapping: Option<BandMapping>,
    /// Multiple of the residual standard deviation (default: 1.5)
    pub k_threshold: f64,
    pub qa: QaParams,
    pub rf_params: ForestParams,
    pub residual: ResidualParams,
    pub spatial_params: SpatialParams,
    pub impact: ImpactParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            band_mapping: None,
            k_threshold: ClassifierParams::default().k_threshold,
            qa: QaParams::default(),
            rf_params: ForestParams::default(),
            residual: ResidualParams::default(),
            spatial_params: SpatialParams::default(),
            impact: ImpactParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every parameter without touching any raster
    pub fn validate(&self) -> Result<()> {
        if let Some(mapping) = &self.band_mapping {
            mapping.validate()?;
        }
        self.classifier_params().validate()?;
        self.rf_params.validate()?;
        self.residual.validate()?;
        self.spatial_params.validate()?;
        self.impact.validate()
    }

    pub fn classifier_params(&self) -> ClassifierParams {
        ClassifierParams {
            k_threshold: self.k_threshold,
        }
    }
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub bands: BandSet,
    pub qa_valid: Mask,
    pub indices: IndexStack,
    pub fit: ResidualFit,
    pub masks: AnomalyMasks,
    pub partition: ZonePartition,
    pub scores: ScoreTables,
    /// Data-quality warnings from every stage, in stage order
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    /// Zone codes 0-4 on the input grid
    pub fn classification(&self) -> &Raster<u8> {
        &self.partition.classification
    }

    /// Observed minus predicted LST in °C
    pub fn residuals(&self) -> &Raster<f64> {
        &self.fit.residuals
    }

    pub fn hot_regions(&self) -> usize {
        self.partition.count(Polarity::Hot)
    }

    pub fn cold_regions(&self) -> usize {
        self.partition.count(Polarity::Cold)
    }
}

/// Thermal anomaly detection pipeline for one scene.
///
/// Holds no state between runs; independent scenes can be analyzed by
/// separate instances in parallel.
#[derive(Debug, Clone)]
pub struct ThermalAnomalyPipeline {
    config: PipelineConfig,
    resolver: BandResolver,
}

impl ThermalAnomalyPipeline {
    /// Validate `config` and build the pipeline.
    ///
    /// Mapping and parameter errors surface here, before any raster is read.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let resolver = match &config.band_mapping {
            Some(mapping) => BandResolver::new(mapping.clone())?,
            None => BandResolver::landsat89(),
        };
        Ok(Self { config, resolver })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &BandResolver {
        &self.resolver
    }

    /// Run every stage on `stack`
    pub fn run(&self, stack: &BandStack) -> Result<AnalysisResult> {
        let bands = self.resolver.resolve(stack)?;
        let (rows, cols) = bands.shape();
        tracing::info!(rows, cols, bands = bands.names().len(), "resolved bands");

        let qa_valid = qa_valid_mask(bands.require(BandName::QaPixel)?, &self.config.qa);
        tracing::info!(valid = qa_valid.count(), total = rows * cols, "QA mask built");

        let indices = IndexStack::compute(&bands)?;
        let mut diagnostics: Vec<Diagnostic> = indices.diagnostics().to_vec();

        let model = ResidualModel::new(self.config.residual.clone(), self.config.rf_params.clone());
        let fit = model.fit(&indices, &bands, &qa_valid)?;

        let masks = classify_residuals(&fit.residuals, &self.config.classifier_params())?;
        diagnostics.extend(masks.diagnostics.iter().cloned());

        let mut partition = partition_zones(&masks.hot, &masks.cold, &self.config.spatial_params)?;
        partition.classification = fit
            .residuals
            .derive(partition.classification.data().clone())?;
        tracing::info!(
            hot = partition.count(Polarity::Hot),
            cold = partition.count(Polarity::Cold),
            "partitioned anomaly zones"
        );
        if partition.regions.is_empty() {
            diagnostics.push(Diagnostic::NoAnomalies.emit());
        }

        let engine = ScoringEngine::new(self.config.impact);
        let scores = engine.score(&partition, &fit, indices.lst_celsius(), masks.dispersion)?;

        Ok(AnalysisResult {
            bands,
            qa_valid,
            indices,
            fit,
            masks,
            partition,
            scores,
            diagnostics,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::morphology::ZoneClass;
    use thermanom_core::{Error, GeoTransform, CRS};

    /// Clear-sky QA_PIXEL value
    pub(crate) const CLEAR_QA: f64 = 21824.0;
    /// Thermal DN of about 299 K
    pub(crate) const BASE_DN: f64 = 44000.0;

    /// A constant scene with thermal DN raised by `delta_dn` inside `block`
    pub(crate) fn make_scene(
        rows: usize,
        cols: usize,
        block: Option<(usize, usize, usize)>,
        delta_dn: f64,
    ) -> BandStack {
        let transform = GeoTransform::new(500_000.0, 4_000_000.0, 30.0, -30.0);
        let band = |value: f64| {
            let mut r = Raster::filled(rows, cols, value);
            r.set_transform(transform);
            r.set_crs(Some(CRS::from_epsg(32613)));
            r
        };
        let mut thermal = band(BASE_DN);
        if let Some((r0, c0, size)) = block {
            for r in r0..r0 + size {
                for c in c0..c0 + size {
                    thermal.set(r, c, BASE_DN + delta_dn).unwrap();
                }
            }
        }

        BandStack::new()
            .with_band("SR_B2", band(8000.0))
            .unwrap()
            .with_band("SR_B3", band(9000.0))
            .unwrap()
            .with_band("SR_B4", band(8500.0))
            .unwrap()
            .with_band("SR_B5", band(15000.0))
            .unwrap()
            .with_band("SR_B6", band(12000.0))
            .unwrap()
            .with_band("SR_B7", band(10000.0))
            .unwrap()
            .with_band("ST_B10", thermal)
            .unwrap()
            .with_band("QA_PIXEL", band(CLEAR_QA))
            .unwrap()
    }

    pub(crate) fn fast_config() -> PipelineConfig {
        PipelineConfig {
            rf_params: ForestParams {
                n_estimators: 10,
                ..ForestParams::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.k_threshold, 1.5);
        assert_eq!(config.spatial_params.min_anomaly_size, 1);
        assert_eq!(config.spatial_params.agglutination_distance, 4);
        assert_eq!(config.rf_params.random_seed, Some(42));
        assert!(config.band_mapping.is_none());
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{"k_threshold": 2.0, "spatial_params": {"min_anomaly_size": 5}}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.k_threshold, 2.0);
        assert_eq!(config.spatial_params.min_anomaly_size, 5);
        assert_eq!(config.spatial_params.agglutination_distance, 4);
        assert_eq!(config.rf_params.n_estimators, 200);
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let config = PipelineConfig {
            k_threshold: -1.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            ThermalAnomalyPipeline::new(config),
            Err(Error::InvalidParameter { name: "k_threshold", .. })
        ));
    }

    #[test]
    fn test_incomplete_mapping_rejected_up_front() {
        let mapping = BandMapping::from_pairs([("red", "SR_B4"), ("nir", "SR_B5")]).unwrap();
        let config = PipelineConfig {
            band_mapping: Some(mapping),
            ..PipelineConfig::default()
        };
        match ThermalAnomalyPipeline::new(config) {
            Err(Error::MissingBands { names }) => assert_eq!(names.len(), 6),
            other => panic!("Expected MissingBands, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_block_scene_single_hot_region() {
        let stack = make_scene(40, 40, Some((15, 15, 8)), 20.0 / 0.00341802);
        let pipeline = ThermalAnomalyPipeline::new(fast_config()).unwrap();
        let result = pipeline.run(&stack).unwrap();

        assert_eq!(result.hot_regions(), 1);
        assert_eq!(result.cold_regions(), 0);
        let region = &result.partition.regions[0];
        assert_eq!(region.area(), 64);
        assert_eq!(region.core.len(), 36);

        let classes = result.classification();
        assert_eq!(classes.get(18, 18).unwrap(), ZoneClass::HotCore.code());
        assert_eq!(classes.get(15, 15).unwrap(), ZoneClass::HotEaz.code());
        assert_eq!(classes.get(0, 0).unwrap(), ZoneClass::Background.code());
        assert_eq!(classes.transform(), stack.transform().unwrap());

        assert_eq!(result.scores.severities.len(), 1);
        assert_eq!(result.scores.impacts.len(), 64);
        assert_eq!(result.scores.features.len(), 64);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_uniform_scene_has_no_regions() {
        let stack = make_scene(20, 20, None, 0.0);
        let result = ThermalAnomalyPipeline::new(fast_config()).unwrap().run(&stack).unwrap();

        assert!(result.partition.regions.is_empty());
        assert!(result.classification().data().iter().all(|&c| c == 0));
        assert!(result.scores.impacts.is_empty());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::DegenerateDispersion { .. })));
        assert!(result.diagnostics.contains(&Diagnostic::NoAnomalies));
    }

    #[test]
    fn test_clouded_scene_is_insufficient() {
        let mut stack = BandStack::new();
        let clean = make_scene(10, 10, None, 0.0);
        for band in clean.iter() {
            let raster = if band.description == "QA_PIXEL" {
                // Cloud bit set everywhere
                Raster::filled(10, 10, 22280.0)
            } else {
                band.raster.clone()
            };
            let mut raster = raster;
            raster.set_transform(*band.raster.transform());
            raster.set_crs(band.raster.crs().cloned());
            stack.push(band.description.clone(), raster).unwrap();
        }

        let result = ThermalAnomalyPipeline::new(fast_config()).unwrap().run(&stack);
        assert!(matches!(
            result,
            Err(Error::InsufficientData { valid: 0, required: 50 })
        ));
    }
}
