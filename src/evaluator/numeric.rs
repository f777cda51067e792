//! Bundled numeric evaluator

use rand::Rng;
use rand_distr::StandardNormal;
use std::time::{Duration, Instant};
use tracing::trace;

use crate::config::EvaluatorConfig;
use crate::error::EvaluationError;
use crate::evaluator::canonical::{canonicalize, substitute_params};
use crate::evaluator::expr::Expr;
use crate::evaluator::optimize::NelderMead;
use crate::evaluator::{prediction_error, Dataset, Evaluation, Evaluator};

/// Interpreter-based evaluator with Nelder-Mead parameter fitting
///
/// Each call canonicalizes the expression, numbers its free parameters, fits
/// them from a standard-normal random start (or sets them to 1.0 when not
/// optimizing) and reports the error of the fitted expression. Fitting is
/// bounded by both an iteration budget and a per-call wall-clock deadline.
#[derive(Clone, Debug, Default)]
pub struct NumericEvaluator {
    config: EvaluatorConfig,
}

impl NumericEvaluator {
    /// Create an evaluator with the given limits
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Limits in use
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    fn loss(model: &Expr, dataset: &Dataset, params: &[f64]) -> f64 {
        match model.predict(dataset, params) {
            Ok(predictions) => prediction_error(&predictions, dataset.targets()),
            Err(_) => f64::INFINITY,
        }
    }

    fn try_evaluate(
        &self,
        expression: &str,
        dataset: &Dataset,
        optimize: bool,
    ) -> Result<Evaluation, EvaluationError> {
        let budget = Duration::from_millis(self.config.timeout_ms);
        let deadline = Instant::now() + budget;
        let within_budget = || {
            if Instant::now() >= deadline {
                Err(EvaluationError::Timeout(budget.as_millis()))
            } else {
                Ok(())
            }
        };

        let parsed = Expr::parse(expression)?;
        within_budget()?;
        let canonical = canonicalize(&parsed)?;
        let model = Expr::parse(&canonical)?;
        let slots = model.param_count();

        let params = if slots == 0 {
            Vec::new()
        } else if optimize {
            let mut rng = rand::thread_rng();
            let start: Vec<f64> = (0..slots).map(|_| rng.sample(StandardNormal)).collect();
            NelderMead::new(self.config.max_iterations, self.config.tolerance)
                .with_point_tolerance(self.config.point_tolerance)
                .with_deadline(deadline, budget.as_millis())
                .minimize(|p| Self::loss(&model, dataset, p), start)?
                .point
        } else {
            vec![1.0; slots]
        };

        within_budget()?;
        let error = Self::loss(&model, dataset, &params);
        if !error.is_finite() {
            return Err(EvaluationError::NonFinite);
        }
        Ok(Evaluation {
            error,
            resolved: substitute_params(&canonical, &params),
        })
    }
}

impl Evaluator for NumericEvaluator {
    fn evaluate(&self, expression: &str, dataset: &Dataset, optimize: bool) -> Evaluation {
        match self.try_evaluate(expression, dataset, optimize) {
            Ok(evaluation) => evaluation,
            Err(err) => {
                trace!(expression, %err, "evaluation failed");
                Evaluation::failed(expression)
            }
        }
    }

    fn canonicalize(&self, expression: &str) -> Option<String> {
        Expr::parse(expression)
            .and_then(|expr| canonicalize(&expr))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> Dataset {
        let x: Vec<f64> = (1..=8).map(f64::from).collect();
        let t = x.iter().map(|v| 2.0 * v).collect();
        Dataset::new(vec![x], t).unwrap()
    }

    #[test]
    fn test_exact_expression() {
        let ev = NumericEvaluator::default();
        let result = ev.evaluate("X1+X1", &linear(), true);
        assert_eq!(result.error, 0.0);
        assert_eq!(result.resolved, "2*X1");
    }

    #[test]
    fn test_fits_constant() {
        let ev = NumericEvaluator::default();
        let result = ev.evaluate("(C*X1)", &linear(), true);
        assert!(result.error < 1e-8, "error {}", result.error);
        let refit = ev.evaluate(&result.resolved, &linear(), false);
        assert!(refit.error < 1e-8);
    }

    #[test]
    fn test_lone_additive_constant_fits_from_any_start() {
        let x: Vec<f64> = (1..=6).map(f64::from).collect();
        let t = x.iter().map(|v| v * v + v).collect();
        let data = Dataset::new(vec![x], t).unwrap();
        let ev = NumericEvaluator::default();
        // each call draws a fresh random start
        for _ in 0..8 {
            let result = ev.evaluate("((X1*X1)+(X1+C))", &data, true);
            assert!(result.error < 1e-8, "error {}", result.error);
        }
    }

    #[test]
    fn test_unoptimized_constants_are_one() {
        let ev = NumericEvaluator::default();
        let result = ev.evaluate("C*X1", &linear(), false);
        // Σ|x - 2x| = 36, squared over 8 samples
        assert_eq!(result.error, 162.0);
        assert_eq!(result.resolved, "1*X1");
    }

    #[test]
    fn test_failures_become_infinite() {
        let ev = NumericEvaluator::default();
        for bad in ["X1/0", "log(0)", "((X1", "X4", "exp(exp(exp(X1*100)))"] {
            let result = ev.evaluate(bad, &linear(), true);
            assert_eq!(result.error, f64::INFINITY, "{}", bad);
            assert_eq!(result.resolved, bad);
        }
    }

    #[test]
    fn test_deadline_covers_unoptimized_calls() {
        let ev = NumericEvaluator::new(EvaluatorConfig {
            timeout_ms: 0,
            ..EvaluatorConfig::default()
        });
        // no fitting loop runs, the deadline still applies
        let result = ev.evaluate("X1+X1", &linear(), false);
        assert_eq!(result.error, f64::INFINITY);
        assert_eq!(
            ev.try_evaluate("X1+X1", &linear(), false),
            Err(EvaluationError::Timeout(0))
        );
    }

    #[test]
    fn test_canonicalize() {
        let ev = NumericEvaluator::default();
        assert_eq!(ev.canonicalize("C*C*X1+X1*2").as_deref(), Some("C*X1"));
        assert_eq!(ev.canonicalize("log(0)"), None);
    }
}
