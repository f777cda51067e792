//! Shared search state
//!
//! A [`SearchContext`] is created once per run and handed by reference to every
//! engine. It owns the evaluator and both datasets, counts evaluator calls,
//! keeps the best-so-far record and carries the early-stop flag.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::evaluator::{Dataset, Evaluator};

/// A new combined error must beat the record by more than this
pub const BEST_MARGIN: f64 = 1e-10;

/// Best expression found so far and its combined train + test error
#[derive(Clone, Debug, PartialEq)]
pub struct BestRecord {
    expression: Option<String>,
    error: f64,
}

impl Default for BestRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl BestRecord {
    /// Empty record with infinite error
    pub fn new() -> Self {
        Self {
            expression: None,
            error: f64::INFINITY,
        }
    }

    /// Replace the record if `error` is lower by more than [`BEST_MARGIN`]
    pub fn offer(&mut self, expression: &str, error: f64) -> bool {
        if self.error > error + BEST_MARGIN {
            self.expression = Some(expression.to_string());
            self.error = error;
            true
        } else {
            false
        }
    }

    /// Best expression, if any candidate has been accepted
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Combined error of the best expression
    pub fn error(&self) -> f64 {
        self.error
    }
}

/// Evaluator glue shared by all engines
pub struct SearchContext {
    evaluator: Box<dyn Evaluator>,
    train: Dataset,
    test: Dataset,
    optimize: bool,
    threshold: f64,
    best: Mutex<BestRecord>,
    evaluations: AtomicUsize,
    stop: AtomicBool,
}

impl SearchContext {
    /// Create a context for one run
    pub fn new(
        evaluator: Box<dyn Evaluator>,
        train: Dataset,
        test: Dataset,
        optimize: bool,
        threshold: f64,
    ) -> Self {
        Self {
            evaluator,
            train,
            test,
            optimize,
            threshold,
            best: Mutex::new(BestRecord::new()),
            evaluations: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
        }
    }

    /// Score a candidate expression and return its training error
    ///
    /// The held-out set is only evaluated, with the fitted parameters frozen,
    /// when the training error alone does not already lose to the record.
    /// Reaching the error threshold raises the stop flag; once raised, this
    /// returns `f64::INFINITY` without calling the evaluator.
    pub fn score(&self, expression: &str) -> f64 {
        if self.should_stop() {
            return f64::INFINITY;
        }
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let train = self.evaluator.evaluate(expression, &self.train, self.optimize);
        let combined = if !train.is_finite() {
            f64::INFINITY
        } else if train.error > self.best_error() {
            return train.error;
        } else {
            let test = self.evaluator.evaluate(&train.resolved, &self.test, false);
            train.error + test.error
        };

        {
            let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
            if best.offer(&train.resolved, combined) {
                info!(expression = %train.resolved, error = combined, "new best expression");
            }
        }
        if combined <= self.threshold {
            info!(error = combined, threshold = self.threshold, "error threshold reached");
            self.request_stop();
        }
        train.error
    }

    /// Canonical form with `C` placeholders kept
    pub fn canonicalize(&self, expression: &str) -> Option<String> {
        self.evaluator.canonicalize(expression)
    }

    /// Whether the run should wind down
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Raise the early-stop flag
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Evaluator calls made through [`SearchContext::score`]
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Snapshot of the best-so-far record
    pub fn best(&self) -> BestRecord {
        self.best
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Combined error of the best-so-far record
    pub fn best_error(&self) -> f64 {
        self.best.lock().unwrap_or_else(PoisonError::into_inner).error()
    }

    /// Training data
    pub fn train(&self) -> &Dataset {
        &self.train
    }

    /// Held-out data
    pub fn test(&self) -> &Dataset {
        &self.test
    }
}

impl std::fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchContext")
            .field("train_samples", &self.train.len())
            .field("test_samples", &self.test.len())
            .field("optimize", &self.optimize)
            .field("threshold", &self.threshold)
            .field("evaluations", &self.evaluations())
            .field("stopped", &self.should_stop())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::NumericEvaluator;

    fn context(threshold: f64) -> SearchContext {
        let x: Vec<f64> = (1..=6).map(f64::from).collect();
        let t: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let data = Dataset::new(vec![x], t).unwrap();
        SearchContext::new(
            Box::new(NumericEvaluator::default()),
            data.clone(),
            data,
            true,
            threshold,
        )
    }

    #[test]
    fn test_best_record_margin() {
        let mut best = BestRecord::new();
        assert!(best.offer("X1", 1.0));
        assert!(!best.offer("X2", 1.0 - 1e-11));
        assert!(best.offer("X3", 0.5));
        assert_eq!(best.expression(), Some("X3"));
        assert_eq!(best.error(), 0.5);
        assert!(!best.offer("X4", f64::INFINITY));
    }

    #[test]
    fn test_score_updates_record_and_counter() {
        let ctx = context(1e-12);
        let err = ctx.score("X1*X1");
        assert!(err > 0.0);
        assert_eq!(ctx.evaluations(), 1);
        assert_eq!(ctx.best().expression(), Some("X1**2"));
        assert!(!ctx.should_stop());

        // exact hit stops the run
        assert_eq!(ctx.score("X1+X1"), 0.0);
        assert!(ctx.should_stop());
        assert_eq!(ctx.best().error(), 0.0);

        // no further evaluator calls once stopped
        assert_eq!(ctx.score("X1"), f64::INFINITY);
        assert_eq!(ctx.evaluations(), 2);
    }

    #[test]
    fn test_infinite_threshold_stops_on_first_call() {
        let ctx = context(f64::INFINITY);
        ctx.score("log(0)");
        assert!(ctx.should_stop());
        assert_eq!(ctx.evaluations(), 1);
    }

    #[test]
    fn test_worse_training_error_skips_record() {
        let ctx = context(1e-12);
        ctx.score("X1+X1+X1");
        let before = ctx.best();
        ctx.score("X1*X1*X1");
        assert_eq!(ctx.best(), before);
    }
}
