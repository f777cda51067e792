//! Crossover operators

use rand::Rng;

use crate::error::{OperatorError, OperatorResult};
use crate::genome::program::Program;
use crate::grammar::Grammar;
use crate::operators::traits::CrossoverOperator;

/// One-point subtree crossover
///
/// Picks a non-root node in each parent and swaps the subtrees rooted there.
/// Offspring may break the availability rules; fitness evaluation rejects
/// those.
#[derive(Clone, Debug)]
pub struct SubtreeCrossover {
    grammar: Grammar,
    /// Probability of applying crossover to a selected pair
    pub crossover_probability: f64,
}

impl SubtreeCrossover {
    pub fn new(grammar: Grammar, crossover_probability: f64) -> Self {
        Self {
            grammar,
            crossover_probability,
        }
    }

    fn span<R: Rng>(&self, program: &Program, rng: &mut R) -> Result<(usize, usize), OperatorError> {
        let start = rng.gen_range(1..program.len());
        program
            .subtree_end(&self.grammar, start)
            .map(|end| (start, end))
            .ok_or_else(|| {
                OperatorError::CrossoverFailed(format!(
                    "sequence of {} tokens is not a complete tree",
                    program.len()
                ))
            })
    }
}

impl CrossoverOperator<Program> for SubtreeCrossover {
    fn crossover<R: Rng>(
        &self,
        parent1: &Program,
        parent2: &Program,
        rng: &mut R,
    ) -> OperatorResult<(Program, Program)> {
        if parent1.len() < 2 || parent2.len() < 2 {
            return OperatorResult::Rejected("parent has no subtree below the root");
        }
        let spans = self
            .span(parent1, rng)
            .and_then(|first| Ok((first, self.span(parent2, rng)?)));
        match spans {
            Ok(((s1, e1), (s2, e2))) => {
                let child1 = parent1.splice(s1, e1, &parent2.tokens()[s2..e2]);
                let child2 = parent2.splice(s2, e2, &parent1.tokens()[s1..e1]);
                OperatorResult::Success((child1, child2))
            }
            Err(err) => OperatorResult::Failed(err),
        }
    }

    fn crossover_probability(&self) -> f64 {
        self.crossover_probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Operator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grammar() -> Grammar {
        // 0 Add, 1 Mul, 2 Sin, 3 X1, 4 C
        Grammar::new(&[Operator::Add, Operator::Mul, Operator::Sin], 1, true)
    }

    #[test]
    fn test_offspring_are_complete_trees() {
        let g = grammar();
        let cx = SubtreeCrossover::new(g.clone(), 0.5);
        let mut rng = StdRng::seed_from_u64(8);
        let a = Program::new(vec![0, 1, 3, 4, 2, 3]);
        let b = Program::new(vec![1, 0, 3, 3, 4]);
        for _ in 0..50 {
            let (c1, c2) = cx.crossover(&a, &b, &mut rng).genome().unwrap();
            assert!(c1.height(&g).is_some());
            assert!(c2.height(&g).is_some());
            assert_eq!(c1.len() + c2.len(), a.len() + b.len());
        }
        assert_eq!(cx.crossover_probability(), 0.5);
    }

    #[test]
    fn test_single_node_parent_rejected() {
        let cx = SubtreeCrossover::new(grammar(), 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let result = cx.crossover(&Program::new(vec![3]), &Program::new(vec![0, 3, 4]), &mut rng);
        assert!(matches!(result, OperatorResult::Rejected(_)));
    }

    #[test]
    fn test_broken_parent_fails() {
        let cx = SubtreeCrossover::new(grammar(), 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        // Add(Add(_, _), _) never closes
        let broken = Program::new(vec![0, 0]);
        let result = cx.crossover(&broken, &broken, &mut rng);
        assert!(matches!(result, OperatorResult::Failed(OperatorError::CrossoverFailed(_))));
    }
}
