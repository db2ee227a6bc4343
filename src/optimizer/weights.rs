use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Weight matrix of a linear model
///
/// One row per feature plus a trailing bias row, one column per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    values: Array2<f64>,
}

impl WeightVector {
    pub fn new(num_features: usize, num_labels: usize) -> Self {
        Self {
            values: Array2::zeros((num_features + 1, num_labels)),
        }
    }

    pub fn num_features(&self) -> usize {
        self.values.nrows().saturating_sub(1)
    }

    pub fn num_labels(&self) -> usize {
        self.values.ncols()
    }

    pub fn bias_row(&self) -> usize {
        self.values.nrows().saturating_sub(1)
    }

    /// `(rows, labels)`, rows include the bias row
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Fail unless the matrix has one row per feature, the bias row and one
    /// column per label.
    pub fn check_shape(&self, num_features: usize, num_labels: usize) -> Result<()> {
        let (rows, cols) = self.shape();
        if rows == 0 {
            return Err(Error::DimensionMismatch {
                what: "weight row",
                expected: num_features + 1,
                found: 0,
            });
        }
        if rows - 1 != num_features {
            return Err(Error::DimensionMismatch {
                what: "feature",
                expected: num_features,
                found: rows - 1,
            });
        }
        if cols != num_labels {
            return Err(Error::DimensionMismatch {
                what: "label",
                expected: num_labels,
                found: cols,
            });
        }
        Ok(())
    }

    pub fn get(&self, row: usize, label: usize) -> f64 {
        self.values[[row, label]]
    }

    pub fn set(&mut self, row: usize, label: usize, value: f64) {
        self.values[[row, label]] = value;
    }

    pub fn add(&mut self, row: usize, label: usize, delta: f64) {
        self.values[[row, label]] += delta;
    }

    /// Rows touched by a feature vector with their input values: `1.0` per
    /// known feature and `bias` for the bias row when it is non-zero.
    pub fn active_rows(&self, features: &[u32], bias: f64) -> Vec<(usize, f64)> {
        let num_features = self.num_features();
        let mut rows: Vec<(usize, f64)> = features
            .iter()
            .map(|&f| f as usize)
            .filter(|&f| f < num_features)
            .map(|f| (f, 1.0))
            .collect();
        if bias != 0.0 {
            rows.push((self.bias_row(), bias));
        }
        rows
    }

    /// One linear score per label
    pub fn scores(&self, features: &[u32], bias: f64) -> Vec<f64> {
        let mut scores = vec![0.0; self.num_labels()];
        for (row, x) in self.active_rows(features, bias) {
            for (score, w) in scores.iter_mut().zip(self.values.row(row)) {
                *score += w * x;
            }
        }
        scores
    }

    /// Whether every weight is exactly zero
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&w| w == 0.0)
    }
}
