//! Expression evaluation
//!
//! The search engines talk to evaluation through the [`Evaluator`] trait
//! only. [`NumericEvaluator`] is the bundled implementation.

pub mod canonical;
pub mod expr;
pub mod numeric;
pub mod optimize;

use serde::{Deserialize, Serialize};

use crate::error::{RegressionError, RegressionResult};

pub use numeric::NumericEvaluator;

/// Outcome of one evaluator call
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Error on the dataset, `f64::INFINITY` for any failure
    pub error: f64,
    /// Canonical expression with fitted parameter values substituted
    pub resolved: String,
}

impl Evaluation {
    /// The infinite-error sentinel for `expression`
    pub fn failed(expression: &str) -> Self {
        Self {
            error: f64::INFINITY,
            resolved: expression.to_string(),
        }
    }

    /// Whether the evaluation produced a usable error
    pub fn is_finite(&self) -> bool {
        self.error.is_finite()
    }
}

/// Scores expression strings against data
///
/// Implementations never fail: malformed, undefined or timed-out candidates
/// get `f64::INFINITY` as their error.
pub trait Evaluator: Send + Sync {
    /// Canonicalize `expression`, fit its `C` placeholders when `optimize` is
    /// set (otherwise they are all 1.0) and report the error on `dataset`
    fn evaluate(&self, expression: &str, dataset: &Dataset, optimize: bool) -> Evaluation;

    /// Canonical form of `expression` with `C` placeholders kept, or `None`
    /// when the expression is malformed or degenerate
    fn canonicalize(&self, expression: &str) -> Option<String>;
}

/// Column-major regression data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    x: Vec<Vec<f64>>,
    t: Vec<f64>,
}

impl Dataset {
    /// Build from one column per input variable plus the targets
    pub fn new(x: Vec<Vec<f64>>, t: Vec<f64>) -> RegressionResult<Self> {
        if t.is_empty() {
            return Err(RegressionError::EmptyDataset("dataset"));
        }
        if let Some(column) = x.iter().find(|column| column.len() != t.len()) {
            return Err(RegressionError::DimensionMismatch {
                expected: t.len(),
                actual: column.len(),
            });
        }
        Ok(Self { x, t })
    }

    /// Build from row-major samples
    pub fn from_rows(rows: &[Vec<f64>], t: Vec<f64>) -> RegressionResult<Self> {
        let num_vars = rows.first().map_or(0, Vec::len);
        if rows.len() != t.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: t.len(),
                actual: rows.len(),
            });
        }
        let mut x = vec![Vec::with_capacity(rows.len()); num_vars];
        for row in rows {
            if row.len() != num_vars {
                return Err(RegressionError::DimensionMismatch {
                    expected: num_vars,
                    actual: row.len(),
                });
            }
            for (column, &v) in x.iter_mut().zip(row) {
                column.push(v);
            }
        }
        Self::new(x, t)
    }

    /// Number of input variables
    pub fn num_vars(&self) -> usize {
        self.x.len()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// Whether there are no samples
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Value of variable `var` (zero-based) at `sample`
    pub fn value(&self, var: usize, sample: usize) -> Option<f64> {
        self.x.get(var).and_then(|column| column.get(sample)).copied()
    }

    /// Target values
    pub fn targets(&self) -> &[f64] {
        &self.t
    }

    /// Input columns
    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.x
    }
}

/// `(Σ|ŷ - t|)² / n`, infinite on any non-finite prediction
pub fn prediction_error(predictions: &[f64], targets: &[f64]) -> f64 {
    if predictions.len() != targets.len() || targets.is_empty() {
        return f64::INFINITY;
    }
    let l1: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).abs())
        .sum();
    let error = l1 * l1 / targets.len() as f64;
    if error.is_finite() {
        error
    } else {
        f64::INFINITY
    }
}

pub mod prelude {
    pub use super::numeric::*;
    pub use super::{prediction_error, Dataset, Evaluation, Evaluator};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_shapes() {
        let d = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], vec![0.0; 3]).unwrap();
        assert_eq!(d.num_vars(), 2);
        assert_eq!(d.len(), 3);
        assert_eq!(d.value(1, 2), Some(6.0));
        assert_eq!(d.value(2, 0), None);
    }

    #[test]
    fn test_dataset_rejects_bad_input() {
        assert!(matches!(
            Dataset::new(vec![vec![1.0]], vec![]),
            Err(RegressionError::EmptyDataset(_))
        ));
        assert!(matches!(
            Dataset::new(vec![vec![1.0, 2.0]], vec![1.0]),
            Err(RegressionError::DimensionMismatch { expected: 1, actual: 2 })
        ));
        assert!(matches!(
            Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0]], vec![0.0, 0.0]),
            Err(RegressionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_prediction_error() {
        // L1 = 1 + 2 = 3, squared over n = 9 / 2
        assert_eq!(prediction_error(&[1.0, 2.0], &[0.0, 4.0]), 4.5);
        assert_eq!(prediction_error(&[f64::NAN], &[0.0]), f64::INFINITY);
        assert_eq!(prediction_error(&[1.0], &[1.0, 2.0]), f64::INFINITY);
    }
}
