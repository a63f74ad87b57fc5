//! Anomaly regions and zone codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign of an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Hot,
    Cold,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Hot => "hot",
            Polarity::Cold => "cold",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zone of a pixel within its region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Erosion-surviving interior
    Core,
    /// Exterior anomaly zone: region minus core
    Eaz,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Core => "core",
            Zone::Eaz => "eaz",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification raster codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ZoneClass {
    Background = 0,
    ColdEaz = 1,
    HotEaz = 2,
    ColdCore = 3,
    HotCore = 4,
}

impl ZoneClass {
    pub fn from_parts(polarity: Polarity, zone: Zone) -> Self {
        match (polarity, zone) {
            (Polarity::Cold, Zone::Eaz) => ZoneClass::ColdEaz,
            (Polarity::Hot, Zone::Eaz) => ZoneClass::HotEaz,
            (Polarity::Cold, Zone::Core) => ZoneClass::ColdCore,
            (Polarity::Hot, Zone::Core) => ZoneClass::HotCore,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ZoneClass::Background),
            1 => Some(ZoneClass::ColdEaz),
            2 => Some(ZoneClass::HotEaz),
            3 => Some(ZoneClass::ColdCore),
            4 => Some(ZoneClass::HotCore),
            _ => None,
        }
    }
}

/// Row/column extent, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }
}

/// A spatially coherent anomaly after agglutination and size filtering.
///
/// `pixels` are the flagged pixels grouped into this region, in row-major
/// order; `core` and `eaz` partition them exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: u32,
    pub polarity: Polarity,
    pub pixels: Vec<(usize, usize)>,
    pub core: Vec<(usize, usize)>,
    pub eaz: Vec<(usize, usize)>,
    /// Centroid in fractional (row, col)
    pub centroid: (f64, f64),
    pub bbox: BoundingBox,
    /// Pixel edges shared with non-member cells or the grid border
    pub perimeter: usize,
}

impl Region {
    /// Area in pixels
    pub fn area(&self) -> usize {
        self.pixels.len()
    }

    pub fn has_core(&self) -> bool {
        !self.core.is_empty()
    }

    /// `16·A / P²`, 1 for a square, capped at 1
    pub fn compactness(&self) -> f64 {
        if self.perimeter == 0 {
            return 0.0;
        }
        let a = self.area() as f64;
        let p = self.perimeter as f64;
        (16.0 * a / (p * p)).min(1.0)
    }

    /// Zone of a member pixel
    pub fn zone_of(&self, row: usize, col: usize) -> Option<Zone> {
        if self.core.binary_search(&(row, col)).is_ok() {
            Some(Zone::Core)
        } else if self.eaz.binary_search(&(row, col)).is_ok() {
            Some(Zone::Eaz)
        } else {
            None
        }
    }

    pub fn class_of(&self, zone: Zone) -> ZoneClass {
        ZoneClass::from_parts(self.polarity, zone)
    }
}
