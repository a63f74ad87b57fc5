//! Normalized difference spectral indices
//!
//! All indices operate on single-band rasters sharing one grid. Values are
//! bounded to [-1, 1]; a zero denominator or a nodata input yields NaN.

use crate::maybe_rayon::*;
use ndarray::Array2;
use thermanom_core::raster::Raster;
use thermanom_core::{Error, Result};

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is clamped to [-1, 1], which only matters when negative
/// reflectances make the denominator smaller than the numerator. Pixels
/// where the denominator is zero or either band is nodata are set to NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }
                row_data[col] = ratio(a - b, a + b);
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized difference of two band sums:
///
/// `((a1 + a2) - (b1 + b2)) / ((a1 + a2) + (b1 + b2))`
pub fn normalized_difference_sum(
    a1: &Raster<f64>,
    a2: &Raster<f64>,
    b1: &Raster<f64>,
    b2: &Raster<f64>,
) -> Result<Raster<f64>> {
    check_dimensions(a1, a2)?;
    check_dimensions(a1, b1)?;
    check_dimensions(a1, b2)?;

    let (rows, cols) = a1.shape();
    let bands = [a1, a2, b1, b2];

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let mut v = [0.0; 4];
                let mut valid = true;
                for (slot, band) in v.iter_mut().zip(bands.iter()) {
                    *slot = unsafe { band.get_unchecked(row, col) };
                    if is_nodata_f64(*slot, band.nodata()) {
                        valid = false;
                        break;
                    }
                }
                if !valid {
                    continue;
                }
                let a = v[0] + v[1];
                let b = v[2] + v[3];
                row_data[col] = ratio(a - b, a + b);
            }
            row_data
        })
        .collect();

    build_output(a1, rows, cols, data)
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den.abs() < 1e-10 {
        return f64::NAN;
    }
    (num / den).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// - Dense vegetation: 0.6 to 0.9
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

// ---------------------------------------------------------------------------
// NDWI
// ---------------------------------------------------------------------------

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate water bodies.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

// ---------------------------------------------------------------------------
// NDBI
// ---------------------------------------------------------------------------

/// Normalized Difference Built-up Index (Zha et al., 2003)
///
/// `NDBI = (SWIR1 - NIR) / (SWIR1 + NIR)`
///
/// Built-up surfaces and bare soil reflect more SWIR than NIR.
pub fn ndbi(swir1: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(swir1, nir)
}

// ---------------------------------------------------------------------------
// NDBSI
// ---------------------------------------------------------------------------

/// Normalized Difference Bare Soil Index
///
/// `NDBSI = ((Red + SWIR1) - (NIR + Blue)) / ((Red + SWIR1) + (NIR + Blue))`
pub fn ndbsi(
    red: &Raster<f64>,
    swir1: &Raster<f64>,
    nir: &Raster<f64>,
    blue: &Raster<f64>,
) -> Result<Raster<f64>> {
    normalized_difference_sum(red, swir1, nir, blue)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

pub(crate) fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    let mut output = template.derive(array)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use thermanom_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    fn make_gradient(rows: usize, cols: usize, start: f64, step: f64) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, start + (row * cols + col) as f64 * step)
                    .unwrap();
            }
        }
        r
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn test_normalized_difference_range() {
        // Crosses zero and goes negative, so the clamp is exercised
        let a = make_gradient(10, 10, 0.1, 0.01);
        let b = make_gradient(10, 10, 0.5, -0.0075);

        let result = normalized_difference(&a, &b).unwrap();

        for row in 0..10 {
            for col in 0..10 {
                let val = result.get(row, col).unwrap();
                if !val.is_nan() {
                    assert!(
                        (-1.0..=1.0).contains(&val),
                        "ND out of range: {} at ({}, {})",
                        val,
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_over_zero_is_nan() {
        let a = make_band(3, 3, 0.0);
        let b = make_band(3, 3, 0.0);
        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_ndvi() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);

        let val = ndvi(&nir, &red).unwrap().get(2, 2).unwrap();
        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert!((val - expected).abs() < 1e-10, "Expected {}, got {}", expected, val);
    }

    #[test]
    fn test_ndwi_water() {
        let green = make_band(5, 5, 0.3);
        let nir = make_band(5, 5, 0.1);

        let val = ndwi(&green, &nir).unwrap().get(2, 2).unwrap();
        assert!(val > 0.0, "Expected positive NDWI, got {}", val);
    }

    #[test]
    fn test_ndbi_built_up() {
        let swir1 = make_band(5, 5, 0.35);
        let nir = make_band(5, 5, 0.25);

        let val = ndbi(&swir1, &nir).unwrap().get(2, 2).unwrap();
        let expected = 0.1 / 0.6;
        assert!((val - expected).abs() < 1e-10, "Expected {}, got {}", expected, val);
    }

    #[test]
    fn test_ndbsi() {
        let red = make_band(5, 5, 0.3);
        let swir1 = make_band(5, 5, 0.4);
        let nir = make_band(5, 5, 0.2);
        let blue = make_band(5, 5, 0.1);

        let val = ndbsi(&red, &swir1, &nir, &blue).unwrap().get(2, 2).unwrap();

        // ((0.3+0.4) - (0.2+0.1)) / 1.0 = 0.4
        assert!((val - 0.4).abs() < 1e-10, "Expected 0.4, got {}", val);
    }

    #[test]
    fn test_nodata_handling() {
        let mut nir = make_band(5, 5, 0.5);
        nir.set_nodata(Some(-9999.0));
        nir.set(2, 2, -9999.0).unwrap();
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan(), "Nodata pixel should be NaN");
        assert!(!result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);
        assert!(normalized_difference(&a, &b).is_err(), "Should fail on dimension mismatch");
    }
}
