//! Description-based band resolution

use super::{BandMapping, BandName};
use std::collections::BTreeMap;
use thermanom_core::raster::GeoTransform;
use thermanom_core::{BandStack, Error, Raster, Result, CRS};

/// Resolved bands of one scene, keyed by semantic name.
///
/// Every required name is present and all rasters share one grid.
#[derive(Debug, Clone)]
pub struct BandSet {
    bands: BTreeMap<BandName, Raster<f64>>,
    shape: (usize, usize),
}

impl BandSet {
    pub fn get(&self, name: BandName) -> Option<&Raster<f64>> {
        self.bands.get(&name)
    }

    /// Band by name, failing if it was not resolved
    pub fn require(&self, name: BandName) -> Result<&Raster<f64>> {
        self.bands.get(&name).ok_or_else(|| Error::MissingBands {
            names: vec![name.as_str().to_string()],
        })
    }

    pub fn contains(&self, name: BandName) -> bool {
        self.bands.contains_key(&name)
    }

    /// Resolved names in canonical order
    pub fn names(&self) -> Vec<BandName> {
        self.bands.keys().copied().collect()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// A raster carrying the shared grid metadata
    pub fn template(&self) -> Result<&Raster<f64>> {
        self.require(BandName::Thermal)
    }

    pub fn transform(&self) -> GeoTransform {
        self.template().map(|r| *r.transform()).unwrap_or_default()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.template().ok().and_then(|r| r.crs())
    }
}

/// How one semantic name fares against a concrete source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandStatus {
    pub name: BandName,
    pub expected: Option<String>,
    pub found: bool,
    pub required: bool,
}

/// Maps semantic band names to source bands by exact description match.
///
/// The mapping is checked for completeness at construction, before any
/// raster is touched. Physical band order in the source is irrelevant.
#[derive(Debug, Clone)]
pub struct BandResolver {
    mapping: BandMapping,
}

impl BandResolver {
    /// Build a resolver, failing with every missing required name at once
    pub fn new(mapping: BandMapping) -> Result<Self> {
        mapping.validate()?;
        Ok(Self { mapping })
    }

    /// Resolver for the Landsat 8/9 table
    pub fn landsat89() -> Self {
        Self {
            mapping: BandMapping::landsat89(),
        }
    }

    pub fn mapping(&self) -> &BandMapping {
        &self.mapping
    }

    /// Resolve every mapped band from `stack`.
    ///
    /// Required bands whose description is absent fail with
    /// [`Error::BandNotFound`]; optional ones are skipped.
    pub fn resolve(&self, stack: &BandStack) -> Result<BandSet> {
        let shape = stack.shape().unwrap_or((0, 0));
        if shape.0 == 0 || shape.1 == 0 {
            return Err(Error::InvalidDimensions {
                width: shape.1,
                height: shape.0,
            });
        }

        let mut bands = BTreeMap::new();
        for name in BandName::REQUIRED.iter().chain(BandName::OPTIONAL.iter()) {
            let Some(expected) = self.mapping.get(*name) else {
                continue;
            };
            match stack.by_description(expected) {
                Some(raster) => {
                    tracing::debug!(band = %name, description = expected, "resolved band");
                    bands.insert(*name, raster.clone());
                }
                None if name.is_required() => {
                    return Err(Error::BandNotFound {
                        key: name.as_str().to_string(),
                        expected: expected.to_string(),
                        available: stack.descriptions().iter().map(|d| d.to_string()).collect(),
                    });
                }
                None => {
                    tracing::debug!(band = %name, description = expected, "optional band not present");
                }
            }
        }

        Ok(BandSet { bands, shape })
    }

    /// Resolution status of every semantic name, without failing
    pub fn status(&self, stack: &BandStack) -> Vec<BandStatus> {
        BandName::ALL
            .iter()
            .map(|name| {
                let expected = self.mapping.get(*name).map(str::to_string);
                let found = expected
                    .as_deref()
                    .map_or(false, |d| stack.by_description(d).is_some());
                BandStatus {
                    name: *name,
                    expected,
                    found,
                    required: name.is_required(),
                }
            })
            .collect()
    }
}

impl Default for BandResolver {
    fn default() -> Self {
        Self::landsat89()
    }
}
