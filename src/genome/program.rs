//! Prefix-encoded expression programs
//!
//! A [`Program`] is the GA's genome: the token ids of one expression tree in
//! pre-order. Subtrees are contiguous spans, which is what the subtree
//! crossover and mutation operators work on.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GrammarError;
use crate::genome::traits::EvolutionaryGenome;
use crate::grammar::{BuildOrder, Constraints, ExprTree, Grammar};

/// Tree-growing strategy for random programs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitMethod {
    /// Operators on every slot above the target depth
    Full,
    /// Any available token above the target depth
    Grow,
}

/// Token sequence of one expression in prefix order
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Program {
    tokens: Vec<usize>,
}

impl Program {
    pub fn new(tokens: Vec<usize>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[usize] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<usize> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Exclusive end of the subtree rooted at `start`
    ///
    /// `None` when the sequence runs out before the subtree closes or holds an
    /// unknown id.
    pub fn subtree_end(&self, grammar: &Grammar, start: usize) -> Option<usize> {
        let mut needed = 1usize;
        let mut index = start;
        while needed > 0 {
            let token = grammar.get(*self.tokens.get(index)?)?;
            needed = needed - 1 + token.arity();
            index += 1;
        }
        Some(index)
    }

    /// Number of levels, or `None` unless the sequence is exactly one tree
    pub fn height(&self, grammar: &Grammar) -> Option<usize> {
        let mut slots = vec![0usize];
        let mut height = 0;
        for &id in &self.tokens {
            let depth = slots.pop()?;
            height = height.max(depth + 1);
            for _ in 0..grammar.get(id)?.arity() {
                slots.push(depth + 1);
            }
        }
        slots.is_empty().then_some(height)
    }

    /// Copy with `tokens[start..end]` replaced by `replacement`
    pub fn splice(&self, start: usize, end: usize, replacement: &[usize]) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() - (end - start) + replacement.len());
        tokens.extend_from_slice(&self.tokens[..start]);
        tokens.extend_from_slice(replacement);
        tokens.extend_from_slice(&self.tokens[end..]);
        Self { tokens }
    }

    /// Rebuild the expression tree
    pub fn to_tree(&self, grammar: &Grammar) -> Result<ExprTree, GrammarError> {
        ExprTree::from_tokens(BuildOrder::Prefix, grammar, &self.tokens)
    }

    /// Random program whose slots at `depth` and below hold terminals
    ///
    /// Every token is drawn from what `constraints` allows at its slot.
    pub fn generate<R: Rng>(
        grammar: &Grammar,
        constraints: &Constraints,
        method: InitMethod,
        depth: usize,
        rng: &mut R,
    ) -> Option<Self> {
        let mut tree = ExprTree::prefix();
        while !tree.is_full() {
            let available = constraints.available(grammar, &tree);
            let (terminals, operators): (Vec<usize>, Vec<usize>) = available
                .iter()
                .partition(|&&id| grammar.tokens()[id].kind.is_terminal());
            let pool = if tree.depth() >= depth {
                &terminals
            } else {
                match method {
                    InitMethod::Full if !operators.is_empty() => &operators,
                    _ => &available,
                }
            };
            let id = pool.choose(rng).or_else(|| available.choose(rng))?;
            tree.add(grammar.token(*id).ok()?).ok()?;
        }
        Some(Self::new(tree.prefix_tokens()))
    }

    /// Ramped half-and-half: a random depth in `min_depth..=max_depth` and a
    /// coin flip between [`InitMethod::Full`] and [`InitMethod::Grow`]
    pub fn generate_ramped<R: Rng>(
        grammar: &Grammar,
        constraints: &Constraints,
        min_depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Option<Self> {
        let depth = rng.gen_range(min_depth..=max_depth.max(min_depth));
        let method = if rng.gen() {
            InitMethod::Full
        } else {
            InitMethod::Grow
        };
        Self::generate(grammar, constraints, method, depth, rng)
    }
}

impl EvolutionaryGenome for Program {}

impl From<Vec<usize>> for Program {
    fn from(tokens: Vec<usize>) -> Self {
        Self::new(tokens)
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
    fn test_subtree_end() {
        let g = grammar();
        // Add(Mul(X1, C), Sin(X1))
        let p = Program::new(vec![0, 1, 3, 4, 2, 3]);
        assert_eq!(p.subtree_end(&g, 0), Some(6));
        assert_eq!(p.subtree_end(&g, 1), Some(4));
        assert_eq!(p.subtree_end(&g, 4), Some(6));
        assert_eq!(p.subtree_end(&g, 5), Some(6));
        assert_eq!(Program::new(vec![0, 3]).subtree_end(&g, 0), None);
    }

    #[test]
    fn test_height() {
        let g = grammar();
        assert_eq!(Program::new(vec![0, 1, 3, 4, 2, 3]).height(&g), Some(3));
        assert_eq!(Program::new(vec![3]).height(&g), Some(1));
        assert_eq!(Program::new(vec![0, 3]).height(&g), None);
        assert_eq!(Program::new(vec![3, 3]).height(&g), None);
        assert_eq!(Program::new(vec![]).height(&g), None);
    }

    #[test]
    fn test_splice() {
        let p = Program::new(vec![0, 1, 3, 4, 2, 3]);
        assert_eq!(p.splice(1, 4, &[3]).tokens(), &[0, 3, 2, 3]);
    }

    #[test]
    fn test_generate_respects_depth_and_rules() {
        let g = grammar();
        let c = Constraints::new(2, 10);
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let p = Program::generate_ramped(&g, &c, 1, 3, &mut rng).unwrap();
            let height = p.height(&g).unwrap();
            assert!((1..=4).contains(&height), "height {}", height);
            let tree = p.to_tree(&g).unwrap();
            assert!(tree.is_full());
            assert!(tree.const_count() <= 2);
        }
    }

    #[test]
    fn test_full_method_reaches_depth() {
        let g = Grammar::new(&[Operator::Add], 1, false);
        let c = Constraints::new(0, 10);
        let mut rng = StdRng::seed_from_u64(2);
        let p = Program::generate(&g, &c, InitMethod::Full, 2, &mut rng).unwrap();
        assert_eq!(p.len(), 7);
        assert_eq!(p.height(&g), Some(3));
    }
}
