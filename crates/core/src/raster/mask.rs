//! Boolean raster masks

use crate::error::{Error, Result};
use ndarray::{Array2, Zip};

/// A boolean raster on the analysis grid.
///
/// Used for the QA validity mask, the hot/cold anomaly masks and the
/// per-region zone masks. Cells outside the grid are treated as `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Mask {
    /// An all-false mask
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), false),
        }
    }

    /// A mask filled with `value`
    pub fn filled(rows: usize, cols: usize, value: bool) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    pub fn from_array(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// Build a mask from a list of (row, col) cells set to true
    pub fn from_cells(rows: usize, cols: usize, cells: &[(usize, usize)]) -> Result<Self> {
        let mut mask = Self::new(rows, cols);
        for &(r, c) in cells {
            mask.set(r, c, true)?;
        }
        Ok(mask)
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Value at (row, col); out-of-grid cells read as false
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).copied().unwrap_or(false)
    }

    /// Value at signed (row, col); out-of-grid cells read as false
    pub fn get_signed(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        self.get(row as usize, col as usize)
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    /// Number of true cells
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Whether no cell is set
    pub fn is_clear(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Coordinates of true cells in row-major order
    pub fn cells(&self) -> Vec<(usize, usize)> {
        self.data
            .indexed_iter()
            .filter_map(|(idx, &v)| if v { Some(idx) } else { None })
            .collect()
    }

    /// Cell-wise AND
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.check_shape(other)?;
        let mut out = self.data.clone();
        Zip::from(&mut out).and(&other.data).for_each(|a, &b| *a = *a && b);
        Ok(Mask { data: out })
    }

    /// Cell-wise OR
    pub fn or(&self, other: &Mask) -> Result<Mask> {
        self.check_shape(other)?;
        let mut out = self.data.clone();
        Zip::from(&mut out).and(&other.data).for_each(|a, &b| *a = *a || b);
        Ok(Mask { data: out })
    }

    /// Cells set in `self` but not in `other`
    pub fn difference(&self, other: &Mask) -> Result<Mask> {
        self.check_shape(other)?;
        let mut out = self.data.clone();
        Zip::from(&mut out).and(&other.data).for_each(|a, &b| *a = *a && !b);
        Ok(Mask { data: out })
    }

    fn check_shape(&self, other: &Mask) -> Result<()> {
        if self.shape() != other.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = other.shape();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }
}
