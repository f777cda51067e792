//! Fitness traits
//!
//! This module defines the fitness evaluation trait. Values are costs:
//! lower is better and `f64::INFINITY` marks a rejected genome.

use crate::genome::traits::EvolutionaryGenome;

/// Fitness evaluation trait
///
/// Defines how to evaluate the cost of a genome.
#[cfg(feature = "parallel")]
pub trait Fitness: Send + Sync {
    /// The genome type being evaluated
    type Genome: EvolutionaryGenome;

    /// Evaluate cost (lower = better)
    fn evaluate(&self, genome: &Self::Genome) -> f64;
}

/// Fitness evaluation trait (non-parallel version)
///
/// Defines how to evaluate the cost of a genome.
#[cfg(not(feature = "parallel"))]
pub trait Fitness {
    /// The genome type being evaluated
    type Genome: EvolutionaryGenome;

    /// Evaluate cost (lower = better)
    fn evaluate(&self, genome: &Self::Genome) -> f64;
}
