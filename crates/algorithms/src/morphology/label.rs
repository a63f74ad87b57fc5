//! Connected-component labeling

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thermanom_core::Mask;

const ROOK: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const QUEEN: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Pixel adjacency used for components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Edge neighbors only
    Four,
    /// Edge and corner neighbors
    #[default]
    Eight,
}

impl Connectivity {
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &ROOK,
            Connectivity::Eight => &QUEEN,
        }
    }
}

/// Component labels of a mask: 0 is background, components are numbered
/// from 1 in raster-scan order of their first cell.
#[derive(Debug, Clone)]
pub struct Labels {
    pub labels: Array2<u32>,
    pub count: usize,
}

impl Labels {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.labels[(row, col)]
    }
}

/// Label the connected components of `mask` by breadth-first flood fill
pub fn label_components(mask: &Mask, connectivity: Connectivity) -> Labels {
    let (rows, cols) = mask.shape();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let offsets = connectivity.offsets();
    let mut next: u32 = 0;

    for row in 0..rows {
        for col in 0..cols {
            if !mask.get(row, col) || labels[(row, col)] != 0 {
                continue;
            }
            next += 1;
            labels[(row, col)] = next;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                for &(dr, dc) in offsets {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if !mask.get_signed(nr, nc) {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if labels[(nr, nc)] == 0 {
                        labels[(nr, nc)] = next;
                        queue.push_back((nr, nc));
                    }
                }
            }
        }
    }

    Labels {
        labels,
        count: next as usize,
    }
}
