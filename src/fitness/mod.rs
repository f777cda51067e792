//! Fitness evaluation
//!
//! This module provides the cost abstraction and the program cost used by
//! the GA engines.

pub mod program;
pub mod traits;

pub mod prelude {
    pub use super::program::*;
    pub use super::traits::*;
}
