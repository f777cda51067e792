//! Genome abstractions and implementations
//!
//! This module provides the core `EvolutionaryGenome` trait and the
//! prefix-encoded [`program::Program`] genome evolved by the GA engines.

pub mod program;
pub mod traits;

pub mod prelude {
    pub use super::program::*;
    pub use super::traits::*;
}
