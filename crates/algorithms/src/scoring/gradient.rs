//! Residual gradient and region boundary metrics

use crate::imagery::build_output;
use crate::maybe_rayon::*;
use thermanom_core::{Raster, Result};

/// Gradient magnitude of a raster.
///
/// Central differences in the interior and one-sided differences at the
/// edges, in cell units. Non-finite inputs are read as 0 so nodata holes
/// show up as steep edges rather than spreading NaN.
pub fn gradient_magnitude(raster: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let at = |r: usize, c: usize| {
        let v = unsafe { raster.get_unchecked(r, c) };
        if v.is_finite() {
            v
        } else {
            0.0
        }
    };

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let gy = axis_difference(row, rows, |i| at(i, col));
                let gx = axis_difference(col, cols, |j| at(row, j));
                *out = (gx * gx + gy * gy).sqrt();
            }
            row_data
        })
        .collect();

    build_output(raster, rows, cols, data)
}

#[inline]
fn axis_difference(i: usize, n: usize, f: impl Fn(usize) -> f64) -> f64 {
    if n < 2 {
        0.0
    } else if i == 0 {
        f(1) - f(0)
    } else if i == n - 1 {
        f(n - 1) - f(n - 2)
    } else {
        (f(i + 1) - f(i - 1)) / 2.0
    }
}

/// Member cells with a 4-neighbour outside the region, plus the in-grid
/// non-member cells 4-adjacent to the region.
///
/// `pixels` must be sorted row-major.
pub fn boundary_cells(pixels: &[(usize, usize)], shape: (usize, usize)) -> Vec<(usize, usize)> {
    let (rows, cols) = shape;
    let member = |r: usize, c: usize| pixels.binary_search(&(r, c)).is_ok();
    let mut cells = Vec::new();

    for &(r, c) in pixels {
        let mut inner = false;
        for (dr, dc) in [(-1isize, 0isize), (1, 0), (0, -1), (0, 1)] {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if !member(nr, nc) {
                inner = true;
                cells.push((nr, nc));
            }
        }
        if inner {
            cells.push((r, c));
        }
    }

    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Mean gradient over a region's inner and outer boundary; 0 when there is
/// no boundary inside the grid
pub fn mean_boundary_gradient(pixels: &[(usize, usize)], gradient: &Raster<f64>) -> f64 {
    let values: Vec<f64> = boundary_cells(pixels, gradient.shape())
        .into_iter()
        .map(|(r, c)| gradient.data()[(r, c)])
        .filter(|v| !v.is_nan())
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// `1 / (1 + mean_boundary_gradient)`: 1 for a seamless region, towards 0
/// for sharp-edged ones
pub fn continuity(mean_gradient: f64) -> f64 {
    1.0 / (1.0 + mean_gradient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_of_linear_ramp() {
        // f = 2 * col: gradient magnitude 2 everywhere
        let mut r = Raster::new(4, 5);
        for row in 0..4 {
            for col in 0..5 {
                r.set(row, col, 2.0 * col as f64).unwrap();
            }
        }
        let g = gradient_magnitude(&r).unwrap();
        for v in g.data().iter() {
            assert!((v - 2.0).abs() < 1e-12, "Expected 2, got {}", v);
        }
    }

    #[test]
    fn test_nan_read_as_zero() {
        let r = Raster::from_vec(vec![f64::NAN, 4.0, 8.0], 1, 3).unwrap();
        let g = gradient_magnitude(&r).unwrap();
        assert!((g.get(0, 0).unwrap() - 4.0).abs() < 1e-12);
        assert!((g.get(0, 1).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_of_block() {
        // 3x3 block in a 7x7 grid: 8 inner ring cells + 12 outer cells
        let pixels: Vec<(usize, usize)> =
            (2..5).flat_map(|r| (2..5).map(move |c| (r, c))).collect();
        let cells = boundary_cells(&pixels, (7, 7));
        assert_eq!(cells.len(), 20);
        assert!(!cells.contains(&(3, 3)));
        assert!(cells.contains(&(1, 3)));
        assert!(!cells.contains(&(1, 1)), "corners are not 4-adjacent");
    }

    #[test]
    fn test_flat_field_is_continuous() {
        let flat = Raster::filled(6, 6, 1.5);
        let g = gradient_magnitude(&flat).unwrap();
        let pixels = vec![(2, 2), (2, 3)];
        let mean = mean_boundary_gradient(&pixels, &g);
        assert_eq!(mean, 0.0);
        assert_eq!(continuity(mean), 1.0);
    }

    #[test]
    fn test_whole_grid_region_has_no_boundary() {
        let pixels: Vec<(usize, usize)> =
            (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        assert!(boundary_cells(&pixels, (3, 3)).is_empty());
    }
}
