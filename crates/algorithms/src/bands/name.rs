//! Closed set of semantic band names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thermanom_core::{Error, Result};

/// Semantic name of a band, independent of sensor and file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandName {
    Coastal,
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
    Thermal,
    QaPixel,
    QaAerosol,
}

impl BandName {
    /// Every recognized name
    pub const ALL: [BandName; 10] = [
        BandName::Coastal,
        BandName::Blue,
        BandName::Green,
        BandName::Red,
        BandName::Nir,
        BandName::Swir1,
        BandName::Swir2,
        BandName::Thermal,
        BandName::QaPixel,
        BandName::QaAerosol,
    ];

    /// Names a band mapping must provide
    pub const REQUIRED: [BandName; 8] = [
        BandName::Blue,
        BandName::Green,
        BandName::Red,
        BandName::Nir,
        BandName::Swir1,
        BandName::Swir2,
        BandName::Thermal,
        BandName::QaPixel,
    ];

    /// Names resolved when present and skipped otherwise
    pub const OPTIONAL: [BandName; 2] = [BandName::Coastal, BandName::QaAerosol];

    /// Surface reflectance bands used as model predictors
    pub const REFLECTANCE: [BandName; 6] = [
        BandName::Blue,
        BandName::Green,
        BandName::Red,
        BandName::Nir,
        BandName::Swir1,
        BandName::Swir2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BandName::Coastal => "coastal",
            BandName::Blue => "blue",
            BandName::Green => "green",
            BandName::Red => "red",
            BandName::Nir => "nir",
            BandName::Swir1 => "swir1",
            BandName::Swir2 => "swir2",
            BandName::Thermal => "thermal",
            BandName::QaPixel => "qa_pixel",
            BandName::QaAerosol => "qa_aerosol",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for BandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownBand {
                name: s.to_string(),
                recognized: Self::ALL.iter().map(|n| n.as_str().to_string()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        for name in BandName::ALL {
            assert_eq!(name.as_str().parse::<BandName>().unwrap(), name);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(matches!("NIR".parse::<BandName>(), Err(Error::UnknownBand { .. })));
        assert!(matches!("tir".parse::<BandName>(), Err(Error::UnknownBand { .. })));
    }

    #[test]
    fn test_required_and_optional_partition_all() {
        for name in BandName::ALL {
            assert_ne!(name.is_required(), BandName::OPTIONAL.contains(&name), "{}", name);
        }
    }
}
