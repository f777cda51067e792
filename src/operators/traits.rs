//! Operator traits
//!
//! This module defines the core operator traits for the genetic engines.
//! Fitness values handed to selection are costs: lower is better.

use rand::Rng;

use crate::error::OperatorResult;
use crate::genome::traits::EvolutionaryGenome;

/// Selection operator trait
///
/// Selects individuals from a population for reproduction.
pub trait SelectionOperator<G: EvolutionaryGenome>: Send + Sync {
    /// Select a single individual from the population
    ///
    /// Returns the index of the selected individual.
    fn select<R: Rng>(
        &self,
        population: &[(G, f64)], // (genome, cost) pairs
        rng: &mut R,
    ) -> usize;
}

/// Crossover operator trait
///
/// Combines genetic material from two parents to create offspring.
pub trait CrossoverOperator<G: EvolutionaryGenome>: Send + Sync {
    /// Apply crossover to two parents and produce two offspring
    fn crossover<R: Rng>(
        &self,
        parent1: &G,
        parent2: &G,
        rng: &mut R,
    ) -> OperatorResult<(G, G)>;

    /// Get the probability of crossover being applied
    fn crossover_probability(&self) -> f64 {
        1.0
    }
}

/// Mutation operator trait
///
/// Applies random changes to a genome.
pub trait MutationOperator<G: EvolutionaryGenome>: Send + Sync {
    /// Apply mutation to a genome in place
    fn mutate<R: Rng>(&self, genome: &mut G, rng: &mut R);

    /// Get the probability of mutation being applied to an offspring
    fn mutation_probability(&self) -> f64 {
        1.0
    }
}
