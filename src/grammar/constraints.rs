//! Token availability rules
//!
//! Both search engines consult the same rules before inserting a token:
//! - no trigonometric function anywhere below another one
//! - `Log` never directly under `Exp` and vice versa
//! - no constant slot once the per-tree budget is used up
//! - only terminals once the depth limit is passed

use rand::seq::SliceRandom;
use rand::Rng;

use crate::grammar::token::{Grammar, Operator, TokenKind};
use crate::grammar::tree::ExprTree;

/// Availability filter parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constraints {
    /// Constant-slot budget per tree
    pub max_const: usize,
    /// Deepest slot that may still receive an operator
    pub max_depth: usize,
    /// Whether the root may be a trigonometric function
    pub trig_at_root: bool,
    /// Upper bound on the number of tokens in a finished tree
    pub max_tokens: Option<usize>,
}

impl Constraints {
    /// Create a constraint set
    pub fn new(max_const: usize, max_depth: usize) -> Self {
        Self {
            max_const,
            max_depth,
            trig_at_root: true,
            max_tokens: None,
        }
    }

    /// Disallow a trigonometric root
    pub fn without_trig_root(mut self) -> Self {
        self.trig_at_root = false;
        self
    }

    /// Cap the size of finished trees
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Whether `kind` may fill the next open slot of `tree`
    pub fn allows(&self, tree: &ExprTree, kind: TokenKind) -> bool {
        if tree.depth() > self.max_depth && !kind.is_terminal() {
            return false;
        }
        if let Some(max_tokens) = self.max_tokens {
            // Smallest finished size if every remaining slot became a leaf
            let remaining = if tree.is_empty() { 1 } else { tree.open_slots() };
            if !kind.is_terminal() && tree.len() + remaining + kind.arity() > max_tokens {
                return false;
            }
        }
        if kind.is_trig() && (tree.trig_count() > 0 || (!self.trig_at_root && tree.is_empty())) {
            return false;
        }
        match (tree.head_token(), kind) {
            (Some(TokenKind::Op(Operator::Exp)), TokenKind::Op(Operator::Log))
            | (Some(TokenKind::Op(Operator::Log)), TokenKind::Op(Operator::Exp)) => return false,
            _ => {}
        }
        !(kind.is_const() && tree.const_count() >= self.max_const)
    }

    /// Ids that may fill the next open slot, ascending
    pub fn available(&self, grammar: &Grammar, tree: &ExprTree) -> Vec<usize> {
        grammar
            .tokens()
            .iter()
            .filter(|t| self.allows(tree, t.kind))
            .map(|t| t.id)
            .collect()
    }

    /// Ids excluded for the next open slot, ascending
    pub fn unavailable(&self, grammar: &Grammar, tree: &ExprTree) -> Vec<usize> {
        grammar
            .tokens()
            .iter()
            .filter(|t| !self.allows(tree, t.kind))
            .map(|t| t.id)
            .collect()
    }

    /// Pick uniformly among the available tokens
    pub fn sample<R: Rng>(&self, grammar: &Grammar, tree: &ExprTree, rng: &mut R) -> Option<usize> {
        self.available(grammar, tree).choose(rng).copied()
    }

    /// Fill every open slot with uniformly sampled available tokens
    ///
    /// Returns false if some slot had no available token, which cannot happen
    /// while the grammar has at least one variable.
    pub fn complete<R: Rng>(&self, grammar: &Grammar, tree: &mut ExprTree, rng: &mut R) -> bool {
        while !tree.is_full() {
            let Some(id) = self.sample(grammar, tree, rng) else {
                return false;
            };
            if tree.add(&grammar.tokens()[id]).is_err() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::tree::BuildOrder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grammar() -> Grammar {
        // 0 Add, 1 Exp, 2 Log, 3 Sin, 4 Cos, 5 X1, 6 C
        Grammar::new(
            &[
                Operator::Add,
                Operator::Exp,
                Operator::Log,
                Operator::Sin,
                Operator::Cos,
            ],
            1,
            true,
        )
    }

    #[test]
    fn test_trig_excluded_under_trig() {
        let g = grammar();
        let c = Constraints::new(8, 5);
        // Sin(Add(_, _)) - the slot under Add still has a trig ancestor
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[3, 0]).unwrap();
        let unavailable = c.unavailable(&g, &tree);
        assert!(unavailable.contains(&3));
        assert!(unavailable.contains(&4));
        assert!(!unavailable.contains(&0));
    }

    #[test]
    fn test_trig_root_rule() {
        let g = grammar();
        let tree = ExprTree::level();
        assert!(Constraints::new(8, 5).available(&g, &tree).contains(&3));
        let no_root = Constraints::new(8, 5).without_trig_root();
        assert!(!no_root.available(&g, &tree).contains(&3));
        assert!(!no_root.available(&g, &tree).contains(&4));
    }

    #[test]
    fn test_exp_log_mutual_exclusion() {
        let g = grammar();
        let c = Constraints::new(8, 5);
        let under_exp = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[1]).unwrap();
        assert!(!c.available(&g, &under_exp).contains(&2));
        assert!(c.available(&g, &under_exp).contains(&1));

        let under_log = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[2]).unwrap();
        assert!(!c.available(&g, &under_log).contains(&1));
    }

    #[test]
    fn test_const_budget() {
        let g = grammar();
        let c = Constraints::new(1, 5);
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[0, 6]).unwrap();
        assert_eq!(tree.const_count(), 1);
        assert!(!c.available(&g, &tree).contains(&6));
        assert!(c.available(&g, &tree).contains(&5));
    }

    #[test]
    fn test_depth_limit_only_terminals() {
        let g = grammar();
        let c = Constraints::new(8, 1);
        // Add(Add(_, _), _) - next slot is at depth 2
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[0, 0]).unwrap();
        assert_eq!(tree.depth(), 2);
        assert_eq!(c.available(&g, &tree), vec![5, 6]);
    }

    #[test]
    fn test_token_budget() {
        let g = grammar();
        let c = Constraints::new(8, 10).with_max_tokens(4);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut tree = ExprTree::prefix();
            assert!(c.complete(&g, &mut tree, &mut rng));
            assert!(tree.len() <= 4);
        }
        // Add(X1, _) already needs 3 tokens; another Add would need 5
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[0, 5]).unwrap();
        assert!(!c.available(&g, &tree).contains(&0));
        assert!(c.available(&g, &tree).contains(&1));
    }

    #[test]
    fn test_complete_produces_full_tree() {
        let g = grammar();
        let c = Constraints::new(2, 3);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut tree = ExprTree::prefix();
            assert!(c.complete(&g, &mut tree, &mut rng));
            assert!(tree.is_full());
            assert!(tree.const_count() <= 2);
            assert!(tree.height() <= 5);
        }
    }
}
