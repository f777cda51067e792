//! Diagnostics and statistics
//!
//! Per-generation statistics for GA plays. Costs are lower-is-better, and
//! rejected programs (infinite cost) are counted but kept out of the moments.

use serde::{Deserialize, Serialize};

use crate::genome::traits::EvolutionaryGenome;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Statistics for a single generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number
    pub generation: usize,
    /// Total cost evaluations so far
    pub evaluations: usize,
    /// Lowest cost in this generation
    pub best_cost: f64,
    /// Highest finite cost in this generation
    pub worst_cost: f64,
    /// Mean finite cost
    pub mean_cost: f64,
    /// Median finite cost
    pub median_cost: f64,
    /// Finite cost standard deviation
    pub cost_std: f64,
    /// Individuals with infinite cost
    pub rejected: usize,
}

impl GenerationStats {
    /// Compute statistics from a population
    pub fn from_population<G>(
        population: &Population<G>,
        generation: usize,
        evaluations: usize,
    ) -> Self
    where
        G: EvolutionaryGenome,
    {
        let evaluated: Vec<f64> = population.iter().filter_map(Individual::score).collect();
        let mut costs: Vec<f64> = evaluated.iter().copied().filter(|c| c.is_finite()).collect();
        let rejected = evaluated.len() - costs.len();

        if costs.is_empty() {
            return Self {
                generation,
                evaluations,
                best_cost: f64::INFINITY,
                worst_cost: f64::INFINITY,
                mean_cost: f64::INFINITY,
                median_cost: f64::INFINITY,
                cost_std: 0.0,
                rejected,
            };
        }

        costs.sort_by(|a, b| a.total_cmp(b));

        let best = costs[0];
        let worst = costs[costs.len() - 1];
        let mean = costs.iter().sum::<f64>() / costs.len() as f64;
        let median = if costs.len() % 2 == 0 {
            (costs[costs.len() / 2 - 1] + costs[costs.len() / 2]) / 2.0
        } else {
            costs[costs.len() / 2]
        };
        let variance = if costs.len() > 1 {
            costs.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (costs.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            generation,
            evaluations,
            best_cost: best,
            worst_cost: worst,
            mean_cost: mean,
            median_cost: median,
            cost_std: variance.sqrt(),
            rejected,
        }
    }
}

pub mod prelude {
    pub use super::GenerationStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::program::Program;

    #[test]
    fn test_generation_stats() {
        let pop: Population<Program> = [1.0, 2.0, 3.0, 4.0, f64::INFINITY]
            .iter()
            .enumerate()
            .map(|(i, &c)| Individual::scored(Program::new(vec![i]), c, 0))
            .collect();
        let stats = GenerationStats::from_population(&pop, 3, 40);
        assert_eq!(stats.generation, 3);
        assert_eq!(stats.evaluations, 40);
        assert_eq!(stats.best_cost, 1.0);
        assert_eq!(stats.worst_cost, 4.0);
        assert!((stats.mean_cost - 2.5).abs() < 1e-12);
        assert!((stats.median_cost - 2.5).abs() < 1e-12);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_all_rejected() {
        let pop: Population<Program> =
            vec![Individual::scored(Program::new(vec![0]), f64::INFINITY, 0)]
                .into_iter()
                .collect();
        let stats = GenerationStats::from_population(&pop, 0, 1);
        assert_eq!(stats.best_cost, f64::INFINITY);
        assert_eq!(stats.rejected, 1);
    }
}
