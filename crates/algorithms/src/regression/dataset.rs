//! Dense row-major feature matrix

use thermanom_core::{Error, Result};

/// Samples × features matrix with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    names: Vec<String>,
}

impl FeatureMatrix {
    /// Empty matrix with the given column names
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            data: Vec::new(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Empty matrix with room for `rows` samples
    pub fn with_capacity<S: Into<String>>(names: impl IntoIterator<Item = S>, rows: usize) -> Self {
        let mut m = Self::new(names);
        m.data.reserve(rows * m.n_features());
        m
    }

    /// Append one sample
    pub fn push_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.n_features() {
            return Err(Error::Algorithm(format!(
                "feature row has {} values, matrix has {} columns",
                row.len(),
                self.n_features()
            )));
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    pub fn n_samples(&self) -> usize {
        if self.names.is_empty() {
            0
        } else {
            self.data.len() / self.names.len()
        }
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Feature values of sample `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.names.len();
        &self.data[i * n..(i + 1) * n]
    }

    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.data[sample * self.names.len() + feature]
    }

    /// Per-feature (mean, population std) over all samples
    pub fn column_moments(&self) -> Vec<(f64, f64)> {
        let n = self.n_samples();
        (0..self.n_features())
            .map(|f| {
                if n == 0 {
                    return (0.0, 0.0);
                }
                let mean = (0..n).map(|i| self.get(i, f)).sum::<f64>() / n as f64;
                let var = (0..n)
                    .map(|i| {
                        let d = self.get(i, f) - mean;
                        d * d
                    })
                    .sum::<f64>()
                    / n as f64;
                (mean, var.sqrt())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_rows() {
        let mut m = FeatureMatrix::new(["a", "b"]);
        m.push_row(&[1.0, 2.0]).unwrap();
        m.push_row(&[3.0, 4.0]).unwrap();
        assert_eq!(m.n_samples(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.get(0, 1), 2.0);
        assert!(m.push_row(&[1.0]).is_err());
    }

    #[test]
    fn test_column_moments() {
        let mut m = FeatureMatrix::new(["a", "b"]);
        m.push_row(&[1.0, 5.0]).unwrap();
        m.push_row(&[3.0, 5.0]).unwrap();
        let moments = m.column_moments();
        assert!((moments[0].0 - 2.0).abs() < 1e-12);
        assert!((moments[0].1 - 1.0).abs() < 1e-12);
        assert_eq!(moments[1].1, 0.0);
    }
}
