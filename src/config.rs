//! Run configuration
//!
//! All hyperparameters are fixed before a run starts. Every section has
//! serde defaults so partial JSON files load, and field aliases accept the
//! key names of the classic `config.json` layout (`epoch`, `pops`, `cxpb`,
//! `gp`, ...).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::grammar::Operator;
use crate::msdb::FormType;

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressorConfig {
    /// Run-wide settings
    pub base: BaseConfig,
    /// Settings shared by both MCTS engines
    pub mcts: MctsConfig,
    /// Settings shared by both GA engines
    #[serde(alias = "gp")]
    pub ga: GaConfig,
    /// Outer-form discovery settings
    pub msdb: MsdbConfig,
    /// Bundled evaluator limits
    pub evaluator: EvaluatorConfig,
}

/// Run-wide settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Number of pipeline epochs
    #[serde(alias = "epoch")]
    pub epochs: usize,
    /// Whether the grammar includes the free-parameter token `C`
    pub has_const: bool,
    /// Fit free parameters (otherwise they are all 1.0)
    pub const_optimize: bool,
    /// Operator tokens
    pub tokens: Vec<Operator>,
    /// Stop once the combined error is at or below this value
    pub reward_end_threshold: f64,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            has_const: true,
            const_optimize: true,
            tokens: Operator::DEFAULT.to_vec(),
            reward_end_threshold: 1e-10,
        }
    }
}

/// MCTS and double-Q settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Constant-slot budget per tree
    pub max_const: usize,
    /// Double-Q learning rate
    pub q_learning_rate: f64,
    /// Deepest slot that may receive an operator
    pub max_height: usize,
    /// Upper bound on tokens per tree
    pub max_token: usize,
    /// Expression pool capacity
    #[serde(alias = "max_exp_num")]
    pub max_expr_num: usize,
    /// Per-token reward discount
    pub token_discount: f64,
    /// Simulations per committed token
    pub times: usize,
    /// Double-Q bootstrap discount
    pub q_learning_discount: f64,
    /// Probability of following the learned policy instead of uniform exploration
    pub q_learning_epsilon: f64,
    /// Visits a child needs before the bandit takes over
    #[serde(alias = "mcts_min_visits", alias = "n0")]
    pub min_visits: usize,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            max_const: 8,
            q_learning_rate: 1e-3,
            max_height: 5,
            max_token: 20,
            max_expr_num: 250,
            token_discount: 0.99,
            times: 100,
            q_learning_discount: 0.95,
            q_learning_epsilon: 0.6,
            min_visits: 10,
        }
    }
}

/// Genetic-programming settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Constant-slot budget per program
    pub max_const: usize,
    /// Population size
    #[serde(alias = "pops")]
    pub population_size: usize,
    /// Generations per play
    #[serde(alias = "times")]
    pub generations: usize,
    /// Tournament size
    #[serde(alias = "tournsize")]
    pub tournament_size: usize,
    /// Static height limit for offspring
    pub max_height: usize,
    /// Crossover probability
    #[serde(alias = "cxpb")]
    pub crossover_probability: f64,
    /// Mutation probability
    #[serde(alias = "mutpb")]
    pub mutation_probability: f64,
    /// Hall-of-fame size
    #[serde(alias = "hof_size")]
    pub hall_of_fame_size: usize,
    /// Per-token cost discount
    pub token_discount: f64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            max_const: 5,
            population_size: 500,
            generations: 30,
            tournament_size: 10,
            max_height: 10,
            crossover_probability: 0.1,
            mutation_probability: 0.5,
            hall_of_fame_size: 20,
            token_discount: 0.99,
        }
    }
}

/// Outer-form discovery settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsdbConfig {
    /// Candidates considered for the additive form
    #[serde(alias = "max_expr_num")]
    pub max_used_expr_num: usize,
    /// Minimum `best / error` ratio for a candidate to be considered
    pub expr_ratio: f64,
    /// Fraction of considered candidates a sub-term must appear in
    pub token_ratio: f64,
    /// Forms to try
    #[serde(alias = "form_type")]
    pub form_types: Vec<FormType>,
}

impl Default for MsdbConfig {
    fn default() -> Self {
        Self {
            max_used_expr_num: 10,
            expr_ratio: 0.1,
            token_ratio: 0.5,
            form_types: vec![FormType::Add, FormType::Mul, FormType::Pow],
        }
    }
}

/// Limits for [`crate::evaluator::NumericEvaluator`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Wall-clock budget per evaluation call
    pub timeout_ms: u64,
    /// Nelder-Mead iteration budget
    pub max_iterations: usize,
    /// Nelder-Mead convergence tolerance on the simplex values
    pub tolerance: f64,
    /// Nelder-Mead convergence tolerance on the simplex vertices
    pub point_tolerance: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            max_iterations: 200,
            tolerance: 1e-12,
            point_tolerance: 1e-10,
        }
    }
}

fn unit_open(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v > 0.0 && v < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be in (0, 1), got {}", v)))
    }
}

fn probability(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be in [0, 1], got {}", v)))
    }
}

fn positive(field: &'static str, v: usize) -> Result<(), ConfigError> {
    if v > 0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be positive"))
    }
}

impl RegressorConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the engines cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base.tokens.is_empty() {
            return Err(ConfigError::invalid("base.tokens", "at least one operator is required"));
        }
        if self.base.reward_end_threshold.is_nan() {
            return Err(ConfigError::invalid("base.reward_end_threshold", "must not be NaN"));
        }

        unit_open("mcts.token_discount", self.mcts.token_discount)?;
        unit_open("mcts.q_learning_discount", self.mcts.q_learning_discount)?;
        probability("mcts.q_learning_epsilon", self.mcts.q_learning_epsilon)?;
        if !(self.mcts.q_learning_rate > 0.0 && self.mcts.q_learning_rate <= 1.0) {
            return Err(ConfigError::invalid(
                "mcts.q_learning_rate",
                format!("must be in (0, 1], got {}", self.mcts.q_learning_rate),
            ));
        }
        positive("mcts.times", self.mcts.times)?;
        positive("mcts.max_expr_num", self.mcts.max_expr_num)?;
        if self.mcts.max_token < 6 {
            return Err(ConfigError::invalid(
                "mcts.max_token",
                "must allow trees longer than five tokens",
            ));
        }

        unit_open("ga.token_discount", self.ga.token_discount)?;
        probability("ga.crossover_probability", self.ga.crossover_probability)?;
        probability("ga.mutation_probability", self.ga.mutation_probability)?;
        positive("ga.population_size", self.ga.population_size)?;
        positive("ga.tournament_size", self.ga.tournament_size)?;
        positive("ga.hall_of_fame_size", self.ga.hall_of_fame_size)?;

        positive("msdb.max_used_expr_num", self.msdb.max_used_expr_num)?;
        probability("msdb.token_ratio", self.msdb.token_ratio)?;
        if self.msdb.expr_ratio < 0.0 {
            return Err(ConfigError::invalid("msdb.expr_ratio", "must not be negative"));
        }

        positive("evaluator.max_iterations", self.evaluator.max_iterations)?;
        if !(self.evaluator.point_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "evaluator.point_tolerance",
                "must not be negative",
            ));
        }
        if self.evaluator.timeout_ms == 0 {
            return Err(ConfigError::invalid("evaluator.timeout_ms", "must be positive"));
        }
        Ok(())
    }
}
