//! Termination criteria
//!
//! This module provides the termination criteria checked by the GA engine
//! before every generation.

use crate::genome::traits::EvolutionaryGenome;
use crate::population::population::Population;

/// Evolution state for termination checking
#[derive(Clone, Debug)]
pub struct EvolutionState<'a, G>
where
    G: EvolutionaryGenome,
{
    /// Current generation number
    pub generation: usize,
    /// Total cost evaluations so far
    pub evaluations: usize,
    /// Lowest cost found so far
    pub best_cost: f64,
    /// Whether the run-wide stop flag has been raised
    pub stop_requested: bool,
    /// Reference to the current population
    pub population: &'a Population<G>,
}

/// Termination criterion trait
pub trait TerminationCriterion<G: EvolutionaryGenome>: Send + Sync {
    /// Check if evolution should terminate
    fn should_terminate(&self, state: &EvolutionState<G>) -> bool;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

/// Terminate after a maximum number of generations
#[derive(Clone, Debug)]
pub struct MaxGenerations(pub usize);

impl MaxGenerations {
    /// Create a new max generations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl<G: EvolutionaryGenome> TerminationCriterion<G> for MaxGenerations {
    fn should_terminate(&self, state: &EvolutionState<G>) -> bool {
        state.generation >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum generations reached"
    }
}

/// Terminate once the run-wide stop flag is raised
#[derive(Clone, Debug, Default)]
pub struct StopRequested;

impl<G: EvolutionaryGenome> TerminationCriterion<G> for StopRequested {
    fn should_terminate(&self, state: &EvolutionState<G>) -> bool {
        state.stop_requested
    }

    fn reason(&self) -> &'static str {
        "Stop requested"
    }
}

/// Combine criteria with OR logic (any one triggers termination)
pub struct AnyOf<G: EvolutionaryGenome> {
    criteria: Vec<Box<dyn TerminationCriterion<G>>>,
}

impl<G: EvolutionaryGenome> AnyOf<G> {
    /// Create a new AnyOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion<G>>>) -> Self {
        Self { criteria }
    }

    /// Reason of the first criterion that fires
    pub fn triggered(&self, state: &EvolutionState<G>) -> Option<&'static str> {
        self.criteria
            .iter()
            .find(|c| c.should_terminate(state))
            .map(|c| c.reason())
    }
}

impl<G: EvolutionaryGenome> TerminationCriterion<G> for AnyOf<G> {
    fn should_terminate(&self, state: &EvolutionState<G>) -> bool {
        self.criteria.iter().any(|c| c.should_terminate(state))
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

pub mod prelude {
    pub use super::{AnyOf, EvolutionState, MaxGenerations, StopRequested, TerminationCriterion};
}
