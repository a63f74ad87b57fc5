//! Binary dilation
//!
//! A cell is set when any cell under the structuring element centered on it
//! is set. Cells outside the grid count as unset.

use super::element::StructuringElement;
use crate::maybe_rayon::*;
use ndarray::Array2;
use thermanom_core::{Error, Mask, Result};

/// Dilate `mask` by `element`
pub fn dilate_mask(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();
    let radius = element.radius();

    // Rows with no set cell in the element's vertical reach stay clear
    let row_has_any: Vec<bool> = mask
        .data()
        .rows()
        .into_iter()
        .map(|r| r.iter().any(|&v| v))
        .collect();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            let lo = row.saturating_sub(radius);
            let hi = (row + radius).min(rows.saturating_sub(1));
            if !row_has_any[lo..=hi].iter().any(|&v| v) {
                return row_data;
            }

            let r = row as isize;
            for (col, out) in row_data.iter_mut().enumerate() {
                let c = col as isize;
                *out = offsets
                    .iter()
                    .any(|&(dr, dc)| mask.get_signed(r + dr, c + dc));
            }
            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Mask::from_array(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel_grows_to_element() {
        let mask = Mask::from_cells(9, 9, &[(4, 4)]).unwrap();
        let out = dilate_mask(&mask, &StructuringElement::Disk(2)).unwrap();
        assert_eq!(out.count(), StructuringElement::Disk(2).offsets().len());
        assert!(out.get(2, 4));
        assert!(!out.get(2, 2));
    }

    #[test]
    fn test_bridges_nearby_blobs() {
        let mask = Mask::from_cells(5, 12, &[(2, 2), (2, 8)]).unwrap();
        let out = dilate_mask(&mask, &StructuringElement::Disk(3)).unwrap();
        // Gap of 5 cells closes with radius 3 from both sides
        for col in 2..=8 {
            assert!(out.get(2, col), "col {} should be set", col);
        }
    }

    #[test]
    fn test_clipped_at_grid_edge() {
        let mask = Mask::from_cells(3, 3, &[(0, 0)]).unwrap();
        let out = dilate_mask(&mask, &StructuringElement::Square(1)).unwrap();
        assert_eq!(out.cells(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_empty_stays_empty() {
        let out = dilate_mask(&Mask::new(6, 6), &StructuringElement::Disk(4)).unwrap();
        assert!(out.is_clear());
    }
}
