//! Derivative-free parameter fitting
//!
//! Nelder-Mead simplex search with the standard coefficients (reflection 1,
//! expansion 2, contraction 0.5, shrink 0.5) and a wall-clock deadline.

use std::time::Instant;

use crate::error::EvaluationError;

/// Simplex size below which the vertices count as collapsed
pub const DEFAULT_POINT_TOLERANCE: f64 = 1e-10;

/// Result of a minimization
#[derive(Clone, Debug, PartialEq)]
pub struct Minimum {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
}

/// Nelder-Mead minimizer
#[derive(Clone, Debug)]
pub struct NelderMead {
    max_iterations: usize,
    tolerance: f64,
    point_tolerance: f64,
    deadline: Option<(Instant, u128)>,
}

impl NelderMead {
    /// Create a minimizer that stops after `max_iterations` or once the
    /// simplex values span at most `tolerance` and every vertex lies within
    /// [`DEFAULT_POINT_TOLERANCE`] of the best one
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            point_tolerance: DEFAULT_POINT_TOLERANCE,
            deadline: None,
        }
    }

    /// Largest per-coordinate distance from the best vertex at convergence
    pub fn with_point_tolerance(mut self, point_tolerance: f64) -> Self {
        self.point_tolerance = point_tolerance;
        self
    }

    /// Abort with [`EvaluationError::Timeout`] once `deadline` passes
    pub fn with_deadline(mut self, deadline: Instant, budget_ms: u128) -> Self {
        self.deadline = Some((deadline, budget_ms));
        self
    }

    fn check_deadline(&self) -> Result<(), EvaluationError> {
        match self.deadline {
            Some((deadline, budget)) if Instant::now() >= deadline => {
                Err(EvaluationError::Timeout(budget))
            }
            _ => Ok(()),
        }
    }

    fn spread(&self, simplex: &[Vec<f64>]) -> f64 {
        let best = &simplex[0];
        simplex[1..]
            .iter()
            .flat_map(|vertex| vertex.iter().zip(best).map(|(x, b)| (x - b).abs()))
            .fold(0.0, f64::max)
    }

    /// Minimize `f` starting from `start`
    ///
    /// NaN objective values are treated as `+inf`.
    pub fn minimize<F>(&self, f: F, start: Vec<f64>) -> Result<Minimum, EvaluationError>
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_nan() {
                f64::INFINITY
            } else {
                v
            }
        };

        let n = start.len();
        if n == 0 {
            let value = eval(&start);
            return Ok(Minimum {
                point: start,
                value,
                iterations: 0,
            });
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.clone());
        for i in 0..n {
            let mut vertex = start.clone();
            vertex[i] = if vertex[i] != 0.0 {
                1.05 * vertex[i]
            } else {
                0.00025
            };
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|x| eval(x)).collect();

        let mut iterations = 0;
        while iterations < self.max_iterations {
            self.check_deadline()?;

            let mut order: Vec<usize> = (0..=n).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            if !values[0].is_finite() {
                break;
            }
            // Equal values alone are not convergence: vertices straddling a
            // symmetric minimum score the same while still far from it
            if values[n] - values[0] <= self.tolerance
                && self.spread(&simplex) <= self.point_tolerance
            {
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..n)
                .map(|d| simplex[..n].iter().map(|x| x[d]).sum::<f64>() / n as f64)
                .collect();
            let along = |t: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[n])
                    .map(|(c, w)| c + t * (c - w))
                    .collect()
            };

            let reflected = along(1.0);
            let fr = eval(&reflected);

            if fr < values[0] {
                let expanded = along(2.0);
                let fe = eval(&expanded);
                if fe < fr {
                    simplex[n] = expanded;
                    values[n] = fe;
                } else {
                    simplex[n] = reflected;
                    values[n] = fr;
                }
                continue;
            }
            if fr < values[n - 1] {
                simplex[n] = reflected;
                values[n] = fr;
                continue;
            }

            let (contracted, threshold) = if fr < values[n] {
                (along(0.5), fr)
            } else {
                (along(-0.5), values[n])
            };
            let fc = eval(&contracted);
            if fc < threshold {
                simplex[n] = contracted;
                values[n] = fc;
                continue;
            }

            // Shrink toward the best vertex
            for i in 1..=n {
                let shrunk: Vec<f64> = simplex[0]
                    .iter()
                    .zip(&simplex[i])
                    .map(|(b, x)| b + 0.5 * (x - b))
                    .collect();
                values[i] = eval(&shrunk);
                simplex[i] = shrunk;
            }
        }

        let best = (0..=n)
            .min_by(|&a, &b| values[a].total_cmp(&values[b]))
            .unwrap_or(0);
        Ok(Minimum {
            point: simplex.swap_remove(best),
            value: values[best],
            iterations,
        })
    }
}
