//! Mutation operators

use rand::Rng;

use crate::genome::program::{InitMethod, Program};
use crate::grammar::{Constraints, Grammar};
use crate::operators::traits::MutationOperator;

/// Uniform subtree mutation
///
/// Replaces the subtree at a random node with a freshly grown full tree of
/// depth `0..=max_depth`.
#[derive(Clone, Debug)]
pub struct SubtreeMutation {
    grammar: Grammar,
    constraints: Constraints,
    /// Depth limit of the replacement subtree
    pub max_depth: usize,
    /// Probability of mutating an offspring
    pub mutation_probability: f64,
}

impl SubtreeMutation {
    pub fn new(
        grammar: Grammar,
        constraints: Constraints,
        max_depth: usize,
        mutation_probability: f64,
    ) -> Self {
        Self {
            grammar,
            constraints,
            max_depth,
            mutation_probability,
        }
    }
}

impl MutationOperator<Program> for SubtreeMutation {
    fn mutate<R: Rng>(&self, genome: &mut Program, rng: &mut R) {
        if genome.is_empty() {
            return;
        }
        let start = rng.gen_range(0..genome.len());
        let Some(end) = genome.subtree_end(&self.grammar, start) else {
            return;
        };
        let depth = rng.gen_range(0..=self.max_depth);
        if let Some(subtree) =
            Program::generate(&self.grammar, &self.constraints, InitMethod::Full, depth, rng)
        {
            *genome = genome.splice(start, end, subtree.tokens());
        }
    }

    fn mutation_probability(&self) -> f64 {
        self.mutation_probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Operator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mutants_stay_complete() {
        let g = Grammar::new(&[Operator::Add, Operator::Mul, Operator::Cos], 2, true);
        let m = SubtreeMutation::new(g.clone(), Constraints::new(3, 10), 2, 0.5);
        let mut rng = StdRng::seed_from_u64(13);
        let mut program = Program::new(vec![0, 1, 3, 5, 4]);
        for _ in 0..100 {
            m.mutate(&mut program, &mut rng);
            assert!(program.height(&g).is_some(), "{:?}", program);
            // keep the genome small for the next round
            if program.len() > 30 {
                program = Program::new(vec![0, 3, 4]);
            }
        }
        assert_eq!(m.mutation_probability(), 0.5);
    }

    #[test]
    fn test_broken_genome_untouched() {
        let g = Grammar::new(&[Operator::Add], 1, false);
        let m = SubtreeMutation::new(g, Constraints::new(0, 10), 2, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut program = Program::new(vec![0, 0]);
        m.mutate(&mut program, &mut rng);
        assert_eq!(program.tokens(), &[0, 0]);
    }
}
