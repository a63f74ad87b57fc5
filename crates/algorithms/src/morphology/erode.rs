//! Binary erosion
//!
//! A cell survives when every cell under the structuring element centered
//! on it is set. Cells outside the grid count as unset, so anomalies touching
//! the scene edge erode from that side too.

use super::element::StructuringElement;
use crate::maybe_rayon::*;
use ndarray::Array2;
use thermanom_core::{Error, Mask, Result};

/// Erode `mask` by `element`
pub fn erode_mask(mask: &Mask, element: &StructuringElement) -> Result<Mask> {
    element.validate()?;

    let (rows, cols) = mask.shape();
    let offsets = element.offsets();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let r = row as isize;
            (0..cols)
                .map(|col| {
                    mask.get(row, col)
                        && offsets
                            .iter()
                            .all(|&(dr, dc)| mask.get_signed(r + dr, col as isize + dc))
                })
                .collect::<Vec<bool>>()
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Mask::from_array(array))
}

/// Erode `depth` times, stopping early once nothing is left
pub fn erode_mask_iter(mask: &Mask, element: &StructuringElement, depth: usize) -> Result<Mask> {
    let mut current = mask.clone();
    for _ in 0..depth {
        if current.is_clear() {
            break;
        }
        current = erode_mask(&current, element)?;
    }
    Ok(current)
}
