//! Expression grammar
//!
//! Token dictionary, token-by-token tree builders and the availability
//! filter shared by the search engines.

pub mod constraints;
pub mod token;
pub mod tree;

pub use constraints::Constraints;
pub use token::{Grammar, Operator, Token, TokenKind};
pub use tree::{BuildOrder, ExprTree};

/// Sequences of this many tokens or fewer are never scored
pub const MIN_EXPRESSION_LEN: usize = 5;

pub mod prelude {
    pub use super::constraints::*;
    pub use super::token::*;
    pub use super::tree::*;
    pub use super::MIN_EXPRESSION_LEN;
}
