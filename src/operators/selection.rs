//! Selection operators

use rand::seq::SliceRandom;
use rand::Rng;

use crate::genome::traits::EvolutionaryGenome;
use crate::operators::traits::SelectionOperator;

/// Tournament selection operator
///
/// Selects the lowest-cost individual from a random subset of the population.
#[derive(Clone, Debug)]
pub struct TournamentSelection {
    /// Tournament size (number of individuals competing)
    pub tournament_size: usize,
}

impl TournamentSelection {
    /// Create a new tournament selection with the given size (at least 1)
    pub fn new(tournament_size: usize) -> Self {
        Self {
            tournament_size: tournament_size.max(1),
        }
    }
}

impl<G: EvolutionaryGenome> SelectionOperator<G> for TournamentSelection {
    fn select<R: Rng>(&self, population: &[(G, f64)], rng: &mut R) -> usize {
        debug_assert!(!population.is_empty(), "Population cannot be empty");

        let tournament_size = self.tournament_size.min(population.len());
        let indices: Vec<usize> = (0..population.len()).collect();
        indices
            .choose_multiple(rng, tournament_size)
            .copied()
            .min_by(|&a, &b| population[a].1.total_cmp(&population[b].1))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::program::Program;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population() -> Vec<(Program, f64)> {
        (0..10)
            .map(|i| (Program::new(vec![i]), 10.0 - i as f64))
            .collect()
    }

    #[test]
    fn test_full_tournament_picks_lowest_cost() {
        let mut rng = StdRng::seed_from_u64(42);
        let selection = TournamentSelection::new(10);
        for _ in 0..20 {
            assert_eq!(selection.select(&population(), &mut rng), 9);
        }
    }

    #[test]
    fn test_infinite_costs_lose() {
        let mut rng = StdRng::seed_from_u64(1);
        let pop = vec![
            (Program::new(vec![0]), f64::INFINITY),
            (Program::new(vec![1]), 3.0),
            (Program::new(vec![2]), f64::INFINITY),
        ];
        assert_eq!(TournamentSelection::new(3).select(&pop, &mut rng), 1);
    }

    #[test]
    fn test_selection_pressure() {
        let mut rng = StdRng::seed_from_u64(7);
        let selection = TournamentSelection::new(3);
        let pop = population();
        let picks: Vec<usize> = (0..1000).map(|_| selection.select(&pop, &mut rng)).collect();
        let mean = picks.iter().sum::<usize>() as f64 / picks.len() as f64;
        // uniform picks would average 4.5
        assert!(mean > 5.5, "mean index {}", mean);
    }
}
