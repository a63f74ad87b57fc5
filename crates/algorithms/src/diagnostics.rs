//! Non-fatal data-quality findings
//!
//! Stages that detect a suspicious but survivable condition push a
//! [`Diagnostic`] onto their result instead of failing. Every diagnostic is
//! also mirrored as a `tracing` warning when it is recorded.

use serde::Serialize;
use std::fmt;

/// A data-quality condition observed during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Maximum LST (Kelvin) far below the physically plausible range
    ThermalRangeImplausible { max_kelvin: f64 },
    /// Raw thermal digital numbers far below the expected Level-2 range
    ThermalDnLow { max_dn: f64 },
    /// Residual dispersion is zero or near zero; anomaly masks are empty
    DegenerateDispersion { dispersion: f64 },
    /// No region survived classification and size filtering
    NoAnomalies,
}

impl Diagnostic {
    /// Log the diagnostic at WARN level and return it
    pub fn emit(self) -> Self {
        tracing::warn!(diagnostic = ?self, "{}", self);
        self
    }

    /// Whether the condition points at a wrong band mapping
    pub fn suggests_band_mapping_error(&self) -> bool {
        matches!(
            self,
            Diagnostic::ThermalRangeImplausible { .. } | Diagnostic::ThermalDnLow { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ThermalRangeImplausible { max_kelvin } => write!(
                f,
                "maximum LST is {:.2} K, far below the plausible 250-350 K range; \
                 the thermal band mapping is likely wrong",
                max_kelvin
            ),
            Diagnostic::ThermalDnLow { max_dn } => write!(
                f,
                "maximum thermal DN is {:.0}, expected roughly 10000-15000 for \
                 Level-2 surface temperature; the thermal band mapping is likely wrong",
                max_dn
            ),
            Diagnostic::DegenerateDispersion { dispersion } => write!(
                f,
                "residual dispersion {:.3e} is degenerate; no pixel is flagged",
                dispersion
            ),
            Diagnostic::NoAnomalies => write!(f, "no anomaly region detected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_mapping_hint() {
        assert!(Diagnostic::ThermalDnLow { max_dn: 900.0 }.suggests_band_mapping_error());
        assert!(!Diagnostic::NoAnomalies.suggests_band_mapping_error());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Diagnostic::DegenerateDispersion { dispersion: 0.0 }).unwrap();
        assert!(json.contains("\"kind\":\"degenerate_dispersion\""), "got {}", json);
    }
}
