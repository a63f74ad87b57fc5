//! Semantic name to band description mapping

use super::BandName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thermanom_core::{Error, Result};

/// Landsat 8/9 Collection 2 Level-2 band descriptions
const LANDSAT_89: [(BandName, &str); 10] = [
    (BandName::Coastal, "SR_B1"),
    (BandName::Blue, "SR_B2"),
    (BandName::Green, "SR_B3"),
    (BandName::Red, "SR_B4"),
    (BandName::Nir, "SR_B5"),
    (BandName::Swir1, "SR_B6"),
    (BandName::Swir2, "SR_B7"),
    (BandName::QaAerosol, "SR_QA_AEROSOL"),
    (BandName::Thermal, "ST_B10"),
    (BandName::QaPixel, "QA_PIXEL"),
];

/// Mapping from semantic band name to the description string expected in the
/// source product.
///
/// Keys are validated against [`BandName`] when the mapping is built, so an
/// unknown key is an error rather than a silently ignored entry. Required
/// names are checked separately by [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct BandMapping {
    entries: BTreeMap<BandName, String>,
}

impl BandMapping {
    /// An empty mapping
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The Landsat 8/9 Collection 2 Level-2 table
    pub fn landsat89() -> Self {
        Self {
            entries: LANDSAT_89
                .iter()
                .map(|(name, desc)| (*name, desc.to_string()))
                .collect(),
        }
    }

    /// Build from string pairs, rejecting unknown semantic names
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut mapping = Self::empty();
        for (key, value) in pairs {
            mapping.insert(key.as_ref().parse()?, value);
        }
        Ok(mapping)
    }

    pub fn insert(&mut self, name: BandName, description: impl Into<String>) {
        self.entries.insert(name, description.into());
    }

    pub fn remove(&mut self, name: BandName) -> Option<String> {
        self.entries.remove(&name)
    }

    pub fn get(&self, name: BandName) -> Option<&str> {
        self.entries.get(&name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BandName, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Required names absent from the mapping, in canonical order
    pub fn missing_required(&self) -> Vec<BandName> {
        BandName::REQUIRED
            .iter()
            .copied()
            .filter(|name| !self.entries.contains_key(name))
            .collect()
    }

    /// Fail with one error enumerating every missing required name
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::MissingBands {
            names: missing.iter().map(|n| n.as_str().to_string()).collect(),
        })
    }
}

impl Default for BandMapping {
    fn default() -> Self {
        Self::landsat89()
    }
}

impl TryFrom<BTreeMap<String, String>> for BandMapping {
    type Error = Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        Self::from_pairs(map)
    }
}

impl From<BandMapping> for BTreeMap<String, String> {
    fn from(mapping: BandMapping) -> Self {
        mapping
            .entries
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_complete() {
        let mapping = BandMapping::default();
        assert!(mapping.validate().is_ok());
        assert_eq!(mapping.get(BandName::Thermal), Some("ST_B10"));
        assert_eq!(mapping.get(BandName::QaPixel), Some("QA_PIXEL"));
    }

    #[test]
    fn test_missing_lists_every_name() {
        let mut mapping = BandMapping::landsat89();
        mapping.remove(BandName::Nir);
        mapping.remove(BandName::Thermal);
        mapping.remove(BandName::Coastal);

        match mapping.validate() {
            Err(Error::MissingBands { names }) => {
                assert_eq!(names, vec!["nir".to_string(), "thermal".to_string()]);
            }
            other => panic!("Expected MissingBands, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_mapping_missing_all_required() {
        match BandMapping::empty().validate() {
            Err(Error::MissingBands { names }) => assert_eq!(names.len(), 8),
            other => panic!("Expected MissingBands, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_key() {
        let result = BandMapping::from_pairs([("red", "B4"), ("tirs", "B10")]);
        assert!(matches!(result, Err(Error::UnknownBand { name, .. }) if name == "tirs"));
    }

    #[test]
    fn test_json_round_trip_and_rejection() {
        let json = r#"{"red": "B4", "nir": "B5"}"#;
        let mapping: BandMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.get(BandName::Nir), Some("B5"));

        let back = serde_json::to_string(&mapping).unwrap();
        assert!(back.contains("\"nir\":\"B5\""));

        let bad: std::result::Result<BandMapping, _> = serde_json::from_str(r#"{"ir": "B5"}"#);
        assert!(bad.is_err());
    }
}
