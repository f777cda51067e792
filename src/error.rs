//! Error types for rsrm
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for expression tree construction
///
/// Raised when a caller offers a token that the tree cannot accommodate.
/// The search engines filter tokens through [`crate::grammar::Constraints`]
/// before insertion, so reaching one of these is a contract violation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GrammarError {
    /// The tree has no open slot left
    #[error("Invalid grammar: tree is already full, cannot add token {0}")]
    TreeFull(usize),

    /// Token id is not part of the grammar
    #[error("Invalid grammar: unknown token id {id} (grammar has {len} tokens)")]
    UnknownToken { id: usize, len: usize },

    /// Operation needs at least one node
    #[error("Invalid grammar: expression tree is empty")]
    EmptyTree,

    /// Operation needs a full tree
    #[error("Invalid grammar: expression tree still has {0} open slots")]
    Incomplete(usize),

    /// Every token is excluded for the next open slot
    #[error("Invalid grammar: no token is available after {0} tokens")]
    NoAvailableToken(usize),
}

/// Error type for a single expression evaluation
///
/// These never cross the [`crate::evaluator::Evaluator`] boundary; they are
/// mapped to the infinite-error sentinel there.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    /// Expression text could not be parsed
    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// Expression is algebraically undefined (division by zero, log of a non-positive constant, ...)
    #[error("Degenerate expression: {0}")]
    Degenerate(String),

    /// Wall-clock budget exhausted
    #[error("Evaluation timed out after {0} ms")]
    Timeout(u128),

    /// Prediction produced NaN or infinity
    #[error("Non-finite prediction")]
    NonFinite,

    /// Variable referenced that the dataset does not provide
    #[error("Unknown variable X{index} (dataset has {available})")]
    UnknownVariable { index: usize, available: usize },
}

/// Error type for operator failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperatorError {
    /// Crossover operation failed
    #[error("Crossover failed: {0}")]
    CrossoverFailed(String),
}

/// Error type for configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is outside its permitted range
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    /// IO error while reading a configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Top-level error type for regression runs
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Grammar error
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// Dataset has no samples
    #[error("Dataset '{0}' is empty")]
    EmptyDataset(&'static str),

    /// Dataset shape does not match the configured grammar
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias for regression operations
pub type RegressionResult<T> = Result<T, RegressionError>;

/// Result of an operator application
#[derive(Debug, Clone)]
pub enum OperatorResult<G> {
    /// Operation succeeded
    Success(G),
    /// Operation produced offspring that violate a structural limit; parents are kept
    Rejected(&'static str),
    /// Operation failed unrecoverably
    Failed(OperatorError),
}

impl<G> OperatorResult<G> {
    /// Returns the genome if successful, None otherwise
    pub fn genome(self) -> Option<G> {
        match self {
            Self::Success(g) => Some(g),
            Self::Rejected(_) | Self::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_error_display() {
        let err = GrammarError::TreeFull(3);
        assert_eq!(
            err.to_string(),
            "Invalid grammar: tree is already full, cannot add token 3"
        );

        let err = GrammarError::UnknownToken { id: 12, len: 10 };
        assert_eq!(
            err.to_string(),
            "Invalid grammar: unknown token id 12 (grammar has 10 tokens)"
        );
    }

    #[test]
    fn test_evaluation_error_display() {
        let err = EvaluationError::Parse {
            offset: 4,
            message: "unexpected ')'".to_string(),
        };
        assert_eq!(err.to_string(), "Parse error at offset 4: unexpected ')'");
        assert_eq!(
            EvaluationError::Timeout(1000).to_string(),
            "Evaluation timed out after 1000 ms"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("mcts.token_discount", "must be in (0, 1)");
        assert_eq!(
            err.to_string(),
            "Invalid value for mcts.token_discount: must be in (0, 1)"
        );
    }

    #[test]
    fn test_regression_error_from_grammar_error() {
        let err: RegressionError = GrammarError::EmptyTree.into();
        assert!(matches!(err, RegressionError::Grammar(_)));
    }

    #[test]
    fn test_operator_result_genome() {
        let result: OperatorResult<i32> = OperatorResult::Success(42);
        assert_eq!(result.genome(), Some(42));
        let result: OperatorResult<i32> = OperatorResult::Rejected("height limit");
        assert_eq!(result.genome(), None);
    }
}
