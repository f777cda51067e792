//! MCTS search rounds guided by the double-Q bandit

use rand::Rng;
use tracing::{debug, trace};

use crate::config::MctsConfig;
use crate::context::SearchContext;
use crate::error::GrammarError;
use crate::grammar::{BuildOrder, Constraints, ExprTree, Grammar, MIN_EXPRESSION_LEN};
use crate::mcts::double_q::DoubleQTable;
use crate::mcts::node::SearchTree;
use crate::mcts::pool::ExpressionPool;
use crate::msdb::apply_form;

/// Reward for a step that leaves the tree unfinished
pub const STEP_PENALTY: f64 = -0.1;

/// One reinforcement-learning search engine
///
/// Each [`MctsEngine::run`] builds one level-order tree token by token. At
/// every committed position it runs `times` simulations from a fresh search
/// tree, then commits the child with the highest running maximum. The
/// bandit table survives between rounds until [`MctsEngine::clear`].
#[derive(Debug)]
pub struct MctsEngine {
    grammar: Grammar,
    constraints: Constraints,
    q_table: DoubleQTable,
    pool: ExpressionPool,
    form: String,
    times: usize,
    min_visits: usize,
    discount: f64,
    max_expr_num: usize,
}

impl MctsEngine {
    /// Create an engine with an empty pool, an untrained bandit table and no
    /// outer form
    ///
    /// Rollouts never place a trigonometric token at the root and stop
    /// adding operators once a tree could exceed `config.max_token` tokens.
    pub fn new(grammar: Grammar, config: &MctsConfig) -> Self {
        let constraints = Constraints::new(config.max_const, config.max_height)
            .without_trig_root()
            .with_max_tokens(config.max_token);
        let q_table = DoubleQTable::new(grammar.len(), config);
        Self {
            grammar,
            constraints,
            q_table,
            pool: ExpressionPool::new(),
            form: String::new(),
            times: config.times,
            min_visits: config.min_visits,
            discount: config.token_discount,
            max_expr_num: config.max_expr_num,
        }
    }

    /// Outer form every scored expression is wrapped in
    pub fn form(&self) -> &str {
        &self.form
    }

    /// Wrap every expression scored from now on in `form`
    ///
    /// The form is an expression head such as `X1*` or `(X1)**`; the
    /// candidate is appended in brackets.
    pub fn set_form(&mut self, form: impl Into<String>) {
        self.form = form.into();
    }

    /// Drop pooled expressions, the bandit table and the outer form
    pub fn clear(&mut self) {
        self.pool.clear();
        self.q_table.clear();
        self.form.clear();
    }

    /// Pooled prefix sequences, best reward first; empties the pool
    pub fn take_expressions(&mut self) -> Vec<Vec<usize>> {
        self.pool.take()
    }

    /// Pooled sequences without draining
    pub fn pool(&self) -> &ExpressionPool {
        &self.pool
    }

    /// Bandit table learned since the last [`MctsEngine::clear`]
    pub fn q_table(&self) -> &DoubleQTable {
        &self.q_table
    }

    /// Run one search round
    ///
    /// Returns early, leaving the pool as it is, once the context's stop flag
    /// is raised.
    pub fn run<R: Rng>(&mut self, ctx: &SearchContext, rng: &mut R) -> Result<(), GrammarError> {
        let mut search = SearchTree::new(self.min_visits);
        self.q_table.rewind();
        let mut committed = ExprTree::level();

        while !committed.is_full() {
            for _ in 0..self.times {
                if ctx.should_stop() {
                    debug!(committed = committed.len(), "search round abandoned");
                    return Ok(());
                }
                let (q_mark, search_mark) = (self.q_table.current(), search.current());
                self.simulate(&mut search, committed.clone(), ctx, rng)?;
                self.q_table.set_current(q_mark);
                search.set_current(search_mark);
                self.pool.truncate(self.max_expr_num);
            }

            let action = search
                .choose_best()
                .ok_or(GrammarError::NoAvailableToken(committed.len()))?;
            search.step(action);
            self.q_table.step(action);
            committed.add(self.grammar.token(action)?)?;
            trace!(action, len = committed.len(), "committed token");
        }

        debug!(
            pooled = self.pool.len(),
            nodes = search.len(),
            bandit_nodes = self.q_table.len(),
            "search round finished"
        );
        Ok(())
    }

    fn simulate<R: Rng>(
        &mut self,
        search: &mut SearchTree,
        mut tree: ExprTree,
        ctx: &SearchContext,
        rng: &mut R,
    ) -> Result<(), GrammarError> {
        loop {
            let available = self.constraints.available(&self.grammar, &tree);
            if available.is_empty() {
                return Err(GrammarError::NoAvailableToken(tree.len()));
            }
            if !search.is_expanded() {
                search.expand(&available);
            }

            let action = match search.choose_under_visited(rng) {
                Some(action) => action,
                None => self
                    .q_table
                    .choose_action(&available, rng)
                    .ok_or(GrammarError::NoAvailableToken(tree.len()))?,
            };
            let visits = search.step(action);
            tree.add(self.grammar.token(action)?)?;

            if tree.is_full() {
                let reward = self.reward(&tree, ctx)?;
                self.q_table.learn(action, reward, true, rng);
                search.backpropagate(reward);
                return Ok(());
            }

            if visits == 1 {
                let mut rollout = tree;
                if !self.constraints.complete(&self.grammar, &mut rollout, rng) {
                    return Err(GrammarError::NoAvailableToken(rollout.len()));
                }
                let reward = self.reward(&rollout, ctx)?;
                self.q_table.learn(action, reward, true, rng);
                search.backpropagate(reward);
                return Ok(());
            }

            self.q_table.learn(action, STEP_PENALTY, false, rng);
            self.q_table.step(action);
        }
    }

    /// `discount^L / (1 + error)` for a finished tree of `L` tokens
    ///
    /// Trees of at most [`MIN_EXPRESSION_LEN`] tokens get 0 without being
    /// scored. Every scored tree is offered to the pool.
    pub fn reward(&mut self, tree: &ExprTree, ctx: &SearchContext) -> Result<f64, GrammarError> {
        Ok(self.score_tree(tree, ctx)?.map_or(0.0, |(reward, _)| reward))
    }

    /// Training error of a prefix sequence under the current form
    ///
    /// Sequences of at most [`MIN_EXPRESSION_LEN`] tokens are not scored and
    /// report `f64::INFINITY`. A scored sequence is offered to the pool.
    pub fn error_of(&mut self, tokens: &[usize], ctx: &SearchContext) -> Result<f64, GrammarError> {
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &self.grammar, tokens)?;
        Ok(self
            .score_tree(&tree, ctx)?
            .map_or(f64::INFINITY, |(_, error)| error))
    }

    fn score_tree(
        &mut self,
        tree: &ExprTree,
        ctx: &SearchContext,
    ) -> Result<Option<(f64, f64)>, GrammarError> {
        let prefix = tree.prefix_tokens();
        let length = prefix.len();
        if length <= MIN_EXPRESSION_LEN {
            return Ok(None);
        }
        let expression = apply_form(&self.form, &tree.expression()?);
        let error = ctx.score(&expression);
        let reward = self.discount.powi(length as i32) / (1.0 + error);
        self.pool.insert(reward, prefix);
        Ok(Some((reward, error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{Dataset, NumericEvaluator};
    use crate::grammar::Operator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context(threshold: f64) -> SearchContext {
        let x: Vec<f64> = (1..=8).map(f64::from).collect();
        let t: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let data = Dataset::new(vec![x], t).unwrap();
        SearchContext::new(
            Box::new(NumericEvaluator::default()),
            data.clone(),
            data,
            true,
            threshold,
        )
    }

    fn engine() -> MctsEngine {
        let config = MctsConfig {
            times: 8,
            min_visits: 2,
            max_token: 9,
            max_height: 3,
            ..MctsConfig::default()
        };
        MctsEngine::new(Grammar::new(&[Operator::Add, Operator::Mul], 1, true), &config)
    }

    #[test]
    fn test_short_trees_are_not_scored() {
        let ctx = context(0.0);
        let mut engine = engine();
        let g = Grammar::new(&[Operator::Add, Operator::Mul], 1, true);
        // Add(X1, C)
        let tree = ExprTree::from_tokens(BuildOrder::Level, &g, &[0, 2, 3]).unwrap();
        assert_eq!(engine.reward(&tree, &ctx).unwrap(), 0.0);
        assert_eq!(ctx.evaluations(), 0);
        assert!(engine.pool().is_empty());
    }

    #[test]
    fn test_reward_formula_and_form() {
        let ctx = context(0.0);
        let mut engine = engine();
        let g = Grammar::new(&[Operator::Add, Operator::Mul], 1, true);
        // Add(Mul(C, X1), Add(C, X1)) in level order
        let tree = ExprTree::from_tokens(BuildOrder::Level, &g, &[0, 1, 0, 3, 2, 3, 2]).unwrap();
        let reward = engine.reward(&tree, &ctx).unwrap();
        assert!((reward - 0.99f64.powi(7)).abs() < 1e-4, "reward {}", reward);
        assert_eq!(engine.pool().len(), 1);

        engine.set_form("X1*");
        let wrapped = engine.reward(&tree, &ctx).unwrap();
        assert!(wrapped < reward);
        // already pooled
        assert_eq!(engine.pool().len(), 1);
    }

    #[test]
    fn test_error_of_prefix_sequence() {
        let ctx = context(0.0);
        let mut engine = engine();
        // Add(Mul(C, X1), C) in prefix order is too short to score
        assert_eq!(engine.error_of(&[0, 1, 3, 2, 3], &ctx).unwrap(), f64::INFINITY);
        assert_eq!(ctx.evaluations(), 0);
        // Add(Mul(C, X1), Add(C, X1))
        let error = engine.error_of(&[0, 1, 3, 2, 0, 3, 2], &ctx).unwrap();
        assert!(error < 1e-6, "error {}", error);
        assert_eq!(engine.pool().len(), 1);
        assert!(engine.error_of(&[0, 1, 3, 2, 0, 3], &ctx).is_err());
    }

    #[test]
    fn test_run_fills_pool() {
        let ctx = context(0.0);
        let mut engine = engine();
        let mut rng = StdRng::seed_from_u64(17);
        engine.run(&ctx, &mut rng).unwrap();
        assert!(ctx.evaluations() > 0);
        let pooled = engine.take_expressions();
        assert!(!pooled.is_empty());
        assert!(pooled.len() <= 250);
        assert!(pooled.iter().all(|seq| seq.len() > MIN_EXPRESSION_LEN && seq.len() <= 9));
        assert!(engine.take_expressions().is_empty());
    }

    #[test]
    fn test_run_returns_once_stopped() {
        let ctx = context(0.0);
        ctx.request_stop();
        let mut engine = engine();
        let mut rng = StdRng::seed_from_u64(1);
        engine.run(&ctx, &mut rng).unwrap();
        assert_eq!(ctx.evaluations(), 0);
    }

    #[test]
    fn test_stop_mid_round_keeps_engine_state() {
        // the first scored tree meets an infinite threshold
        let ctx = context(f64::INFINITY);
        let mut engine = engine();
        let mut rng = StdRng::seed_from_u64(9);
        engine.set_form("C*");
        engine.run(&ctx, &mut rng).unwrap();
        assert!(ctx.should_stop());
        assert_eq!(ctx.evaluations(), 1);
        assert_eq!(engine.pool().len(), 1);
        assert_eq!(engine.form(), "C*");
        let learned = engine.q_table().len();

        engine.run(&ctx, &mut rng).unwrap();
        assert_eq!(ctx.evaluations(), 1);
        assert_eq!(engine.pool().len(), 1);
        assert_eq!(engine.q_table().len(), learned);
    }

    #[test]
    fn test_clear_resets_form_and_table() {
        let ctx = context(0.0);
        let mut engine = engine();
        let mut rng = StdRng::seed_from_u64(4);
        engine.set_form("C*");
        engine.run(&ctx, &mut rng).unwrap();
        engine.clear();
        assert_eq!(engine.form(), "");
        assert_eq!(engine.q_table().len(), 1);
        assert!(engine.pool().is_empty());
    }
}
