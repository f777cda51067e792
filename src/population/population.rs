//! Population type
//!
//! This module provides the Population container type.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::fitness::traits::Fitness;
use crate::genome::traits::EvolutionaryGenome;
use crate::population::individual::Individual;

/// A population of individuals
#[derive(Clone, Debug)]
pub struct Population<G>
where
    G: EvolutionaryGenome,
{
    /// The individuals in this population
    individuals: Vec<Individual<G>>,
    /// Current generation number
    generation: usize,
}

impl<G> Population<G>
where
    G: EvolutionaryGenome,
{
    /// Create an empty population
    pub fn new() -> Self {
        Self {
            individuals: Vec::new(),
            generation: 0,
        }
    }

    /// Create a population with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            individuals: Vec::with_capacity(capacity),
            generation: 0,
        }
    }

    /// Get the current generation
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Set the generation number
    pub fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    /// Get the population size
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population is empty
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Add an individual to the population
    pub fn push(&mut self, individual: Individual<G>) {
        self.individuals.push(individual);
    }

    /// Get an iterator over the individuals
    pub fn iter(&self) -> impl Iterator<Item = &Individual<G>> {
        self.individuals.iter()
    }

    /// Get genome-cost pairs as owned tuples
    pub fn as_fitness_pairs(&self) -> Vec<(G, f64)> {
        self.individuals
            .iter()
            .filter_map(|i| i.score().map(|cost| (i.genome.clone(), cost)))
            .collect()
    }

    /// Evaluate all individuals using the given fitness function (sequential)
    pub fn evaluate<Fit>(&mut self, fitness: &Fit)
    where
        Fit: Fitness<Genome = G>,
    {
        for individual in &mut self.individuals {
            if !individual.is_evaluated() {
                let cost = fitness.evaluate(&individual.genome);
                individual.set_cost(cost);
            }
        }
    }
}

/// Parallel evaluation support (requires `parallel` feature)
#[cfg(feature = "parallel")]
impl<G> Population<G>
where
    G: EvolutionaryGenome,
{
    /// Evaluate all individuals using the given fitness function (parallel)
    pub fn evaluate_parallel<Fit>(&mut self, fitness: &Fit)
    where
        Fit: Fitness<Genome = G> + Sync,
    {
        self.individuals
            .par_iter_mut()
            .filter(|i| !i.is_evaluated())
            .for_each(|individual| {
                let cost = fitness.evaluate(&individual.genome);
                individual.set_cost(cost);
            });
    }
}

/// Sequential fallback for parallel evaluation (when `parallel` feature is disabled)
#[cfg(not(feature = "parallel"))]
impl<G> Population<G>
where
    G: EvolutionaryGenome,
{
    /// Evaluate all individuals using the given fitness function (sequential fallback)
    pub fn evaluate_parallel<Fit>(&mut self, fitness: &Fit)
    where
        Fit: Fitness<Genome = G>,
    {
        self.evaluate(fitness);
    }
}

impl<G> Default for Population<G>
where
    G: EvolutionaryGenome,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<G> FromIterator<Individual<G>> for Population<G>
where
    G: EvolutionaryGenome,
{
    fn from_iter<I: IntoIterator<Item = Individual<G>>>(iter: I) -> Self {
        Self {
            individuals: iter.into_iter().collect(),
            generation: 0,
        }
    }
}
