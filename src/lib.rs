//! # rsrm
//!
//! Symbolic regression by hybrid search: Monte-Carlo tree search guided by a
//! double Q-learning bandit proposes expression trees, a genetic-programming
//! population refines them, and outer-form discovery factors shared
//! structure out of the best candidates so later rounds search inside it.
//!
//! ## Core Concepts
//!
//! - **Grammar**: a fixed token table (operators, one token per input
//!   variable, an optional free parameter `C`) and availability rules that
//!   keep every tree the engines build well formed
//! - **Evaluator**: canonicalizes an expression, fits its `C` slots and
//!   reports an error; failures become `f64::INFINITY`, never errors
//! - **Search context**: the evaluator glue shared by all engines, holding
//!   the best-so-far record and the early-stop flag
//! - **Pipeline**: an epoch schedule over two MCTS engines and two GA engines
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rsrm::prelude::*;
//!
//! let x: Vec<f64> = (0..20).map(|i| i as f64 / 4.0).collect();
//! let t = x.iter().map(|v| 2.0 * v).collect();
//! let data = Dataset::new(vec![x], t)?;
//!
//! let mut config = RegressorConfig::default();
//! config.base.tokens = vec![Operator::Add, Operator::Mul];
//! config.base.reward_end_threshold = 1e-8;
//!
//! let outcome = Pipeline::new(config).with_seed(7).fit(data.clone(), data)?;
//! println!("{:?} ({})", outcome.expression, outcome.error);
//! ```

pub mod algorithms;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod fitness;
pub mod genome;
pub mod grammar;
pub mod mcts;
pub mod msdb;
pub mod operators;
pub mod pipeline;
pub mod population;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::config::*;
    pub use crate::context::{BestRecord, SearchContext};
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::evaluator::prelude::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::grammar::prelude::*;
    pub use crate::mcts::prelude::*;
    pub use crate::msdb::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::pipeline::{FitOutcome, Pipeline};
    pub use crate::population::prelude::*;
    pub use crate::termination::prelude::*;
}
