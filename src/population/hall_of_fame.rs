//! Hall of fame
//!
//! Keeps the best distinct genomes seen across all generations of a play.

use crate::genome::traits::EvolutionaryGenome;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// The `capacity` lowest-cost distinct genomes ever offered
#[derive(Clone, Debug)]
pub struct HallOfFame<G>
where
    G: EvolutionaryGenome,
{
    members: Vec<Individual<G>>,
    capacity: usize,
}

impl<G> HallOfFame<G>
where
    G: EvolutionaryGenome,
{
    /// Empty hall of fame holding at most `capacity` members
    pub fn new(capacity: usize) -> Self {
        Self {
            members: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Offer every evaluated, finite-cost individual of `population`
    pub fn update(&mut self, population: &Population<G>) {
        for individual in population.iter() {
            match individual.score() {
                Some(cost) if cost.is_finite() => self.offer(individual),
                _ => {}
            }
        }
    }

    fn offer(&mut self, individual: &Individual<G>) {
        if self.members.iter().any(|m| m.genome == individual.genome) {
            return;
        }
        if self.members.len() >= self.capacity
            && self
                .members
                .last()
                .map_or(true, |worst| individual.cost() >= worst.cost())
        {
            return;
        }
        // stable: equal costs keep their arrival order
        let at = self
            .members
            .partition_point(|m| m.cost() <= individual.cost());
        self.members.insert(at, individual.clone());
        self.members.truncate(self.capacity);
    }

    /// Members, lowest cost first
    pub fn members(&self) -> &[Individual<G>] {
        &self.members
    }

    /// Genomes, lowest cost first
    pub fn genomes(&self) -> Vec<G> {
        self.members.iter().map(|m| m.genome.clone()).collect()
    }

    pub fn best(&self) -> Option<&Individual<G>> {
        self.members.first()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::program::Program;

    fn population(entries: &[(usize, f64)]) -> Population<Program> {
        entries
            .iter()
            .map(|&(id, cost)| Individual::scored(Program::new(vec![id]), cost, 0))
            .collect()
    }

    #[test]
    fn test_keeps_lowest_costs() {
        let mut hof = HallOfFame::new(2);
        hof.update(&population(&[(1, 5.0), (2, 1.0), (3, 3.0)]));
        let ids: Vec<usize> = hof.genomes().iter().map(|g| g.tokens()[0]).collect();
        assert_eq!(ids, vec![2, 3]);

        hof.update(&population(&[(4, 0.5), (5, 9.0)]));
        let ids: Vec<usize> = hof.genomes().iter().map(|g| g.tokens()[0]).collect();
        assert_eq!(ids, vec![4, 2]);
        assert_eq!(hof.best().map(|b| b.cost()), Some(0.5));
    }

    #[test]
    fn test_duplicates_and_rejects_are_ignored() {
        let mut hof = HallOfFame::new(5);
        hof.update(&population(&[(1, 2.0), (1, 1.0), (2, f64::INFINITY)]));
        assert_eq!(hof.len(), 1);
        assert_eq!(hof.members()[0].cost(), 2.0);

        let mut unevaluated = Population::new();
        unevaluated.push(Individual::new(Program::new(vec![7])));
        hof.update(&unevaluated);
        assert_eq!(hof.len(), 1);
    }
}
