//! Land surface temperature from Level-2 surface temperature bands
//!
//! The scale and offset are those of Collection 2 Level-2 `ST_B*` products
//! and are applied identically for every sensor generation. Inputs scaled any
//! other way are outside what these conversions can detect.

use crate::diagnostics::Diagnostic;
use thermanom_core::raster::Raster;

/// Kelvin per surface temperature digital number
pub const LST_SCALE: f64 = 0.00341802;
/// Kelvin offset of the surface temperature encoding
pub const LST_OFFSET: f64 = 149.0;
/// 0 °C in Kelvin
pub const KELVIN_OFFSET: f64 = 273.15;

/// Maximum LST below which the thermal mapping is suspect
pub const MIN_PLAUSIBLE_MAX_KELVIN: f64 = 250.0;
/// Maximum raw DN below which the thermal mapping is suspect
pub const MIN_PLAUSIBLE_MAX_DN: f64 = 10_000.0;

#[inline]
pub fn dn_to_kelvin(dn: f64) -> f64 {
    dn * LST_SCALE + LST_OFFSET
}

#[inline]
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// `LST_K = DN * 0.00341802 + 149.0`; nodata DN becomes NaN
pub fn lst_kelvin(thermal: &Raster<f64>) -> Raster<f64> {
    let nodata = thermal.nodata();
    let mut out = thermal.map(|dn| {
        if super::indices::is_nodata_f64(dn, nodata) {
            f64::NAN
        } else {
            dn_to_kelvin(dn)
        }
    });
    out.set_nodata(Some(f64::NAN));
    out
}

/// `LST_C = LST_K - 273.15`
pub fn lst_celsius(kelvin: &Raster<f64>) -> Raster<f64> {
    let mut out = kelvin.map(kelvin_to_celsius);
    out.set_nodata(Some(f64::NAN));
    out
}

/// Check the thermal band and its LST against the plausible ranges.
///
/// Returns one diagnostic per failed check. An all-nodata band yields none;
/// the model fit reports that case.
pub fn thermal_plausibility(thermal: &Raster<f64>, kelvin: &Raster<f64>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let Some(max_kelvin) = kelvin.statistics().max {
        if max_kelvin < MIN_PLAUSIBLE_MAX_KELVIN {
            diagnostics.push(Diagnostic::ThermalRangeImplausible { max_kelvin }.emit());
        }
    }
    if let Some(max_dn) = thermal.statistics().max {
        if max_dn < MIN_PLAUSIBLE_MAX_DN {
            diagnostics.push(Diagnostic::ThermalDnLow { max_dn }.emit());
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_affine_conversion_reference_points() {
        let thermal = Raster::from_vec(vec![0.0, 15000.0], 1, 2).unwrap();
        let k = lst_kelvin(&thermal);
        let c = lst_celsius(&k);

        assert_eq!(k.get(0, 0).unwrap(), 149.0);
        // 15000 * 0.00341802 = 51.2703
        assert_relative_eq!(k.get(0, 1).unwrap(), 200.2703, epsilon = 1e-9);
        assert_relative_eq!(c.get(0, 0).unwrap(), 149.0 - 273.15, epsilon = 1e-12);
        assert_relative_eq!(c.get(0, 1).unwrap(), 200.2703 - 273.15, epsilon = 1e-9);
    }

    #[test]
    fn test_nodata_becomes_nan() {
        let mut thermal = Raster::from_vec(vec![0.0, 44000.0], 1, 2).unwrap();
        thermal.set_nodata(Some(0.0));
        let k = lst_kelvin(&thermal);
        assert!(k.get(0, 0).unwrap().is_nan());
        assert!(!k.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_plausible_scene_has_no_diagnostics() {
        let thermal = Raster::filled(4, 4, 44000.0);
        let k = lst_kelvin(&thermal);
        assert!(thermal_plausibility(&thermal, &k).is_empty());
    }

    #[test]
    fn test_reflectance_band_mapped_as_thermal() {
        // A surface reflectance band picked by mistake: small DNs
        let thermal = Raster::filled(4, 4, 9000.0);
        let diagnostics = thermal_plausibility(&thermal, &lst_kelvin(&thermal));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(Diagnostic::suggests_band_mapping_error));
    }

    #[test]
    fn test_cold_but_plausible_dn_range() {
        // 20000 DN -> ~217 K: DN range fine, temperature not
        let thermal = Raster::filled(4, 4, 20000.0);
        let diagnostics = thermal_plausibility(&thermal, &lst_kelvin(&thermal));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], Diagnostic::ThermalRangeImplausible { .. }));
    }
}
