//! Scored genomes

use serde::{Deserialize, Serialize};

use crate::genome::traits::EvolutionaryGenome;

/// A genome, its cost once scored, and the generation that produced it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Individual<G>
where
    G: EvolutionaryGenome,
{
    pub genome: G,
    cost: Option<f64>,
    /// Generation of the play that bred this individual, 0 for the seeds
    pub generation: usize,
}

impl<G> Individual<G>
where
    G: EvolutionaryGenome,
{
    /// Unscored member of the initial population
    pub fn new(genome: G) -> Self {
        Self {
            genome,
            cost: None,
            generation: 0,
        }
    }

    /// Unscored offspring bred in `generation`
    pub fn offspring(genome: G, generation: usize) -> Self {
        Self {
            genome,
            cost: None,
            generation,
        }
    }

    /// Already scored; used when a parent passes into the next generation
    /// unchanged and must not be evaluated again
    pub fn scored(genome: G, cost: f64, generation: usize) -> Self {
        Self {
            genome,
            cost: Some(cost),
            generation,
        }
    }

    pub fn genome(&self) -> &G {
        &self.genome
    }

    pub fn is_evaluated(&self) -> bool {
        self.cost.is_some()
    }

    /// Cost if scored
    pub fn score(&self) -> Option<f64> {
        self.cost
    }

    /// Cost, `f64::INFINITY` while unscored
    pub fn cost(&self) -> f64 {
        self.cost.unwrap_or(f64::INFINITY)
    }

    pub fn set_cost(&mut self, cost: f64) {
        self.cost = Some(cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::program::Program;

    #[test]
    fn test_unscored_costs_infinity() {
        let seed = Individual::new(Program::new(vec![0, 2, 3]));
        assert!(!seed.is_evaluated());
        assert_eq!(seed.score(), None);
        assert_eq!(seed.cost(), f64::INFINITY);
        assert_eq!(seed.generation, 0);
    }

    #[test]
    fn test_set_cost() {
        let mut child = Individual::offspring(Program::new(vec![1, 2, 2]), 3);
        child.set_cost(0.25);
        assert_eq!(child.score(), Some(0.25));
        assert_eq!(child.generation, 3);
    }

    #[test]
    fn test_carried_parent_keeps_its_cost() {
        let kept = Individual::scored(Program::new(vec![0, 2, 2]), f64::INFINITY, 4);
        assert!(kept.is_evaluated());
        assert_eq!(kept.cost(), f64::INFINITY);
        assert_eq!(kept.genome().tokens(), &[0, 2, 2]);
    }
}
