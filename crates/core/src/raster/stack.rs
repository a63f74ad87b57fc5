//! Described multi-band input

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// Tolerance, in map units, when comparing band geotransforms
const GRID_TOLERANCE: f64 = 1e-6;

/// One physical band of a source product with its text description
#[derive(Debug, Clone)]
pub struct SourceBand {
    /// Band description as written by the producer (e.g. `ST_B10`)
    pub description: String,
    /// Band values
    pub raster: Raster<f64>,
}

/// An ordered set of physical bands sharing one grid.
///
/// This is what a raster reader hands to the analysis core: the bands in
/// file order, each with its description. Band order carries no meaning;
/// consumers look bands up by description.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    bands: Vec<SourceBand>,
}

impl BandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a band, checking that it shares the stack's grid
    pub fn push(&mut self, description: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        let description = description.into();
        if let Some(first) = self.bands.first() {
            check_same_grid(&first.raster, &raster, &description)?;
        }
        self.bands.push(SourceBand {
            description,
            raster,
        });
        Ok(())
    }

    /// Builder-style [`push`](Self::push)
    pub fn with_band(mut self, description: impl Into<String>, raster: Raster<f64>) -> Result<Self> {
        self.push(description, raster)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Grid shape (rows, cols), or None for an empty stack
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|b| b.raster.shape())
    }

    pub fn transform(&self) -> Option<&GeoTransform> {
        self.bands.first().map(|b| b.raster.transform())
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.bands.first().and_then(|b| b.raster.crs())
    }

    /// Band descriptions in file order
    pub fn descriptions(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.description.as_str()).collect()
    }

    /// Look a band up by its exact, case-sensitive description
    pub fn by_description(&self, description: &str) -> Option<&Raster<f64>> {
        self.bands
            .iter()
            .find(|b| b.description == description)
            .map(|b| &b.raster)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceBand> {
        self.bands.iter()
    }
}

fn check_same_grid(reference: &Raster<f64>, band: &Raster<f64>, name: &str) -> Result<()> {
    if reference.shape() != band.shape() {
        let (er, ec) = reference.shape();
        let (ar, ac) = band.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    if !reference
        .transform()
        .same_grid(band.transform(), GRID_TOLERANCE)
    {
        return Err(Error::GridMismatch {
            band: name.to_string(),
            reason: "geotransform differs from the first band".to_string(),
        });
    }
    match (reference.crs(), band.crs()) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => Err(Error::GridMismatch {
            band: name.to_string(),
            reason: format!("CRS {} differs from {}", b, a),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_description() {
        let stack = BandStack::new()
            .with_band("SR_B4", Raster::filled(3, 3, 0.1))
            .unwrap()
            .with_band("SR_B5", Raster::filled(3, 3, 0.4))
            .unwrap();

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.descriptions(), vec!["SR_B4", "SR_B5"]);
        assert_eq!(stack.by_description("SR_B5").unwrap().get(0, 0).unwrap(), 0.4);
        assert!(stack.by_description("sr_b5").is_none());
    }

    #[test]
    fn test_rejects_mismatched_shape() {
        let mut stack = BandStack::new();
        stack.push("a", Raster::new(3, 3)).unwrap();
        assert!(matches!(
            stack.push("b", Raster::new(3, 4)),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_transform() {
        let mut stack = BandStack::new();
        stack.push("a", Raster::new(3, 3)).unwrap();
        let mut shifted: Raster<f64> = Raster::new(3, 3);
        shifted.set_transform(GeoTransform::new(30.0, 0.0, 1.0, -1.0));
        assert!(matches!(
            stack.push("b", shifted),
            Err(Error::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_crs() {
        let mut a: Raster<f64> = Raster::new(2, 2);
        a.set_crs(Some(CRS::from_epsg(32622)));
        let mut b: Raster<f64> = Raster::new(2, 2);
        b.set_crs(Some(CRS::from_epsg(32623)));

        let mut stack = BandStack::new();
        stack.push("a", a).unwrap();
        assert!(stack.push("b", b).is_err());
    }
}
