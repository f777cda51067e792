//! Epoch-scheduled orchestration of the search engines
//!
//! A [`Pipeline`] owns two MCTS engines, two GA engines and one outer-form
//! extractor. Engine 1 of each kind explores with periodic forgetting and
//! feeds outer-form discovery; engine 2 searches inside the discovered form
//! and runs the heavier GA consolidation passes.

use std::collections::{BTreeMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace};

use crate::algorithms::ga_engine::GaEngine;
use crate::config::RegressorConfig;
use crate::context::SearchContext;
use crate::error::{RegressionError, RegressionResult};
use crate::evaluator::{Dataset, Evaluator, NumericEvaluator};
use crate::grammar::{BuildOrder, ExprTree, Grammar};
use crate::mcts::MctsEngine;
use crate::msdb::{Candidate, Msdb};

/// Epochs between resets of RL engine 1 and its accumulated pool
const RL1_RESET_PERIOD: usize = 25;
/// Epochs between resets of RL engine 2, its pool and the GA 2 form
const RL2_RESET_PERIOD: usize = 30;

/// Result of [`Pipeline::fit`]
#[derive(Clone, Debug, PartialEq)]
pub struct FitOutcome {
    /// Best resolved expression, `None` if no candidate ever scored finitely
    pub expression: Option<String>,
    /// Combined train + test error of `expression`
    pub error: f64,
    /// Evaluator calls made
    pub evaluations: usize,
    /// Whether the run ended on the error threshold
    pub stopped_early: bool,
    /// Epochs started
    pub epochs_run: usize,
}

/// Symbolic regression driver
pub struct Pipeline {
    config: RegressorConfig,
    evaluator: Option<Box<dyn Evaluator>>,
    seed: Option<u64>,
}

impl Pipeline {
    /// Create a pipeline using the bundled [`NumericEvaluator`] and an
    /// entropy-seeded random generator
    ///
    /// The configuration is validated by [`Pipeline::fit`], not here.
    pub fn new(config: RegressorConfig) -> Self {
        Self {
            config,
            evaluator: None,
            seed: None,
        }
    }

    /// Fix the random seed for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the bundled [`NumericEvaluator`]
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Settings the pipeline will run with
    pub fn config(&self) -> &RegressorConfig {
        &self.config
    }

    /// Search for an expression of the inputs that reproduces the targets
    ///
    /// Runs the configured number of epochs, or fewer once the combined error
    /// of the best expression reaches `base.reward_end_threshold`.
    pub fn fit(self, train: Dataset, test: Dataset) -> RegressionResult<FitOutcome> {
        self.config.validate()?;
        if train.num_vars() == 0 {
            return Err(RegressionError::EmptyDataset("train inputs"));
        }
        if test.num_vars() != train.num_vars() {
            return Err(RegressionError::DimensionMismatch {
                expected: train.num_vars(),
                actual: test.num_vars(),
            });
        }

        let config = self.config;
        let grammar = Grammar::new(&config.base.tokens, train.num_vars(), config.base.has_const);
        let evaluator: Box<dyn Evaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Box::new(NumericEvaluator::new(config.evaluator.clone())),
        };
        let ctx = SearchContext::new(
            evaluator,
            train,
            test,
            config.base.const_optimize,
            config.base.reward_end_threshold,
        );
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut run = Run {
            rl1: MctsEngine::new(grammar.clone(), &config.mcts),
            rl2: MctsEngine::new(grammar.clone(), &config.mcts),
            ga1: GaEngine::new(grammar.clone(), &config.ga),
            ga2: GaEngine::new(grammar.clone(), &config.ga),
            msdb: Msdb::new(config.msdb.clone()),
            grammar,
            pool1: SeedPool::default(),
            pool2: SeedPool::default(),
        };

        info!(
            epochs = config.base.epochs,
            tokens = run.grammar.len(),
            samples = ctx.train().len(),
            "symbolic regression started"
        );

        let mut epochs_run = 0;
        for epoch in 0..config.base.epochs {
            if ctx.should_stop() {
                break;
            }
            epochs_run += 1;
            let steps = run.epoch(epoch, &ctx, &mut rng)?;
            let best = ctx.best();
            debug!(
                epoch,
                ?steps,
                best = best.expression().unwrap_or(""),
                error = best.error(),
                form = run.rl2.form(),
                evaluations = ctx.evaluations(),
                "epoch finished"
            );
        }

        let best = ctx.best();
        let outcome = FitOutcome {
            expression: best.expression().map(str::to_string),
            error: best.error(),
            evaluations: ctx.evaluations(),
            stopped_early: ctx.should_stop(),
            epochs_run,
        };
        info!(
            expression = outcome.expression.as_deref().unwrap_or(""),
            error = outcome.error,
            evaluations = outcome.evaluations,
            stopped_early = outcome.stopped_early,
            "symbolic regression finished"
        );
        Ok(outcome)
    }
}

/// Engine passes scheduled for one epoch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct EpochSteps {
    /// Reset RL engine 1 and its pool
    reset_first: bool,
    /// Reset RL engine 2, its pool and the GA 2 form
    reset_second: bool,
    /// RL 1, GA 1 and outer-form discovery
    explore: bool,
    /// RL 2 and GA 2 inside the discovered form
    refine: bool,
    /// GA 2 over the accumulated second pool
    consolidate: bool,
    /// GA 1 over the accumulated first pool
    revisit: bool,
}

impl EpochSteps {
    fn for_epoch(epoch: usize) -> Self {
        let phase = epoch % 10;
        Self {
            reset_first: epoch % RL1_RESET_PERIOD == 0,
            reset_second: epoch % RL2_RESET_PERIOD == 0,
            explore: phase <= 8,
            refine: phase >= 5,
            consolidate: phase >= 7,
            revisit: phase == 5,
        }
    }
}

/// Distinct token sequences, oldest first
///
/// Adding a sequence that is already present moves it to the back, so the
/// tail always holds the most recent discoveries.
#[derive(Debug, Default)]
struct SeedPool {
    entries: Vec<Vec<usize>>,
    present: HashSet<Vec<usize>>,
}

impl SeedPool {
    fn extend<I: IntoIterator<Item = Vec<usize>>>(&mut self, found: I) {
        for tokens in found {
            if self.present.contains(&tokens) {
                self.entries.retain(|entry| *entry != tokens);
            } else {
                self.present.insert(tokens.clone());
            }
            self.entries.push(tokens);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.present.clear();
    }

    fn entries(&self) -> &[Vec<usize>] {
        &self.entries
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn best_last(mut ranked: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    ranked.reverse();
    ranked
}

/// Engine state for one call to [`Pipeline::fit`]
struct Run {
    grammar: Grammar,
    rl1: MctsEngine,
    rl2: MctsEngine,
    ga1: GaEngine,
    ga2: GaEngine,
    msdb: Msdb,
    pool1: SeedPool,
    pool2: SeedPool,
}

impl Run {
    fn epoch(
        &mut self,
        epoch: usize,
        ctx: &SearchContext,
        rng: &mut StdRng,
    ) -> RegressionResult<EpochSteps> {
        let steps = EpochSteps::for_epoch(epoch);
        if steps.reset_first {
            self.rl1.clear();
            self.pool1.clear();
        }
        if steps.reset_second {
            self.rl2.clear();
            self.pool2.clear();
            self.ga2.clear_form();
        }

        // GA seeds are read newest first, so every ranked list is handed
        // over best-last to survive the population cut
        if steps.explore && !ctx.should_stop() {
            self.rl1.run(ctx, rng)?;
            let seeds = best_last(self.rl1.take_expressions());
            let found = self.ga1.play(&seeds, ctx, rng);
            self.pool1.extend(found.iter().rev().cloned());
            self.change_expr_form(&found, ctx);
        }
        if steps.refine && !ctx.should_stop() {
            self.rl2.run(ctx, rng)?;
            let found = best_last(self.rl2.take_expressions());
            let refined = self.ga2.play(&found, ctx, rng);
            self.pool2.extend(found);
            self.pool2.extend(refined.into_iter().rev());
        }
        if steps.consolidate && !ctx.should_stop() {
            let refined = self.ga2.play(self.pool2.entries(), ctx, rng);
            self.pool2.extend(refined.into_iter().rev());
        }
        if steps.revisit && !ctx.should_stop() {
            self.ga1.play(self.pool1.entries(), ctx, rng);
        }
        Ok(steps)
    }

    /// Offer the distinct sequences of `found` to outer-form discovery and
    /// hand a discovered form to RL engine 2 and GA engine 2
    fn change_expr_form(&mut self, found: &[Vec<usize>], ctx: &SearchContext) {
        let mut counts: BTreeMap<&[usize], usize> = BTreeMap::new();
        for tokens in found {
            *counts.entry(tokens.as_slice()).or_insert(0) += 1;
        }

        let mut candidates = Vec::with_capacity(counts.len());
        for (tokens, count) in counts {
            if ctx.should_stop() {
                return;
            }
            let scored = self.rl2.error_of(tokens, ctx).and_then(|error| {
                let raw = ExprTree::from_tokens(BuildOrder::Prefix, &self.grammar, tokens)?
                    .expression()?;
                Ok((error, raw))
            });
            let (error, raw) = match scored {
                Ok(scored) => scored,
                Err(err) => {
                    trace!(?tokens, %err, "sequence skipped for outer-form discovery");
                    continue;
                }
            };
            let expression = ctx.canonicalize(&raw).unwrap_or(raw);
            candidates.push(Candidate {
                tokens: tokens.to_vec(),
                error,
                expression,
                count,
            });
        }

        if let Some(form) = self.msdb.get_form(&candidates) {
            self.rl2.set_form(form.text.clone());
            self.ga2.set_form(form.text);
        }
    }
}
