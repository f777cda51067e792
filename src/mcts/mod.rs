//! Monte-Carlo tree search guided by a double Q-learning bandit
//!
//! - [`node`]: arena of per-prefix search statistics (visits, running max)
//! - [`double_q`]: arena of per-prefix bandit estimators
//! - [`pool`]: deduplicated, reward-ordered expression pool
//! - [`engine`]: the search round itself

pub mod double_q;
pub mod engine;
pub mod node;
pub mod pool;

pub use double_q::DoubleQTable;
pub use engine::{MctsEngine, STEP_PENALTY};
pub use node::{NodeId, SearchNode, SearchTree};
pub use pool::ExpressionPool;

pub mod prelude {
    pub use super::{DoubleQTable, ExpressionPool, MctsEngine, NodeId, SearchTree, STEP_PENALTY};
}
