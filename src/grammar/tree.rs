//! Expression trees built token by token
//!
//! Both builders share one arena representation. They differ only in how the
//! open child slots are consumed: the prefix builder fills the most recently
//! opened slot first (a stack), the level builder fills slots breadth first
//! (a queue). Each node's children are listed in insertion order and every
//! node has exactly one parent, so the arena is a strict tree.
//!
//! The builders keep running counts for the next open slot (trigonometric
//! ancestors, parent token, depth) plus the constant count, so the grammar
//! constraints can be checked without walking the tree.

use std::collections::VecDeque;

use crate::error::GrammarError;
use crate::grammar::token::{Grammar, Token, TokenKind};

/// Slot consumption order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOrder {
    /// Pre-order: tokens stream in prefix order
    Prefix,
    /// Breadth-first: tokens fill the tree level by level
    Level,
}

#[derive(Clone, Debug, PartialEq)]
struct Node {
    token: usize,
    kind: TokenKind,
    children: Vec<usize>,
    depth: usize,
    /// Trigonometric tokens on the path from the root to this node, inclusive
    trig_count: usize,
}

/// Expression tree under construction
#[derive(Clone, Debug, PartialEq)]
pub struct ExprTree {
    order: BuildOrder,
    nodes: Vec<Node>,
    /// Parent node index of every open slot
    open: VecDeque<usize>,
    const_count: usize,
}

impl ExprTree {
    /// Empty tree with the given insertion order
    pub fn new(order: BuildOrder) -> Self {
        Self {
            order,
            nodes: Vec::new(),
            open: VecDeque::new(),
            const_count: 0,
        }
    }

    /// Empty prefix-accumulating tree
    pub fn prefix() -> Self {
        Self::new(BuildOrder::Prefix)
    }

    /// Empty level-order tree
    pub fn level() -> Self {
        Self::new(BuildOrder::Level)
    }

    /// Build a tree by inserting token ids in sequence
    pub fn from_tokens(
        order: BuildOrder,
        grammar: &Grammar,
        tokens: &[usize],
    ) -> Result<Self, GrammarError> {
        let mut tree = Self::new(order);
        for &id in tokens {
            tree.add(grammar.token(id)?)?;
        }
        Ok(tree)
    }

    /// Insertion order of this tree
    pub fn order(&self) -> BuildOrder {
        self.order
    }

    fn next_parent(&self) -> Option<usize> {
        match self.order {
            BuildOrder::Prefix => self.open.back().copied(),
            BuildOrder::Level => self.open.front().copied(),
        }
    }

    fn take_slot(&mut self) -> Option<usize> {
        match self.order {
            BuildOrder::Prefix => self.open.pop_back(),
            BuildOrder::Level => self.open.pop_front(),
        }
    }

    /// Place `token` in the next open slot
    pub fn add(&mut self, token: &Token) -> Result<(), GrammarError> {
        if self.is_full() {
            return Err(GrammarError::TreeFull(token.id));
        }

        let parent = self.take_slot();
        let (depth, inherited_trig) = match parent {
            Some(p) => (self.nodes[p].depth + 1, self.nodes[p].trig_count),
            None => (0, 0),
        };

        let index = self.nodes.len();
        self.nodes.push(Node {
            token: token.id,
            kind: token.kind,
            children: Vec::with_capacity(token.arity()),
            depth,
            trig_count: inherited_trig + usize::from(token.kind.is_trig()),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }

        // Slots of one parent are interchangeable, so pushing them all at once
        // keeps children in left-to-right order under both disciplines.
        for _ in 0..token.arity() {
            self.open.push_back(index);
        }
        if token.kind.is_const() {
            self.const_count += 1;
        }
        Ok(())
    }

    /// No tokens inserted yet
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every leaf is a terminal and no slot is open
    pub fn is_full(&self) -> bool {
        !self.nodes.is_empty() && self.open.is_empty()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of open child slots
    pub fn open_slots(&self) -> usize {
        self.open.len()
    }

    /// Depth at which the next token would be placed (root is 0)
    ///
    /// For a full tree this is the depth of its deepest node.
    pub fn depth(&self) -> usize {
        if self.is_full() {
            return self.nodes.iter().map(|n| n.depth).max().unwrap_or(0);
        }
        self.next_parent()
            .map(|p| self.nodes[p].depth + 1)
            .unwrap_or(0)
    }

    /// Number of levels in the tree
    pub fn height(&self) -> usize {
        self.nodes.iter().map(|n| n.depth + 1).max().unwrap_or(0)
    }

    /// Trigonometric tokens above the next open slot
    pub fn trig_count(&self) -> usize {
        self.next_parent()
            .map(|p| self.nodes[p].trig_count)
            .unwrap_or(0)
    }

    /// Token that would become the parent of the next insertion
    pub fn head_token(&self) -> Option<TokenKind> {
        self.next_parent().map(|p| self.nodes[p].kind)
    }

    /// Number of constant-slot tokens inserted
    pub fn const_count(&self) -> usize {
        self.const_count
    }

    /// Token ids in insertion order
    pub fn tokens(&self) -> Vec<usize> {
        self.nodes.iter().map(|n| n.token).collect()
    }

    /// Token ids in prefix (pre-order) order
    pub fn prefix_tokens(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            out.push(node.token);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Infix rendering with one `C` placeholder per constant-slot token
    pub fn expression(&self) -> Result<String, GrammarError> {
        if self.nodes.is_empty() {
            return Err(GrammarError::EmptyTree);
        }
        if !self.is_full() {
            return Err(GrammarError::Incomplete(self.open.len()));
        }
        Ok(self.render(0))
    }

    fn render(&self, index: usize) -> String {
        let node = &self.nodes[index];
        match node.kind {
            TokenKind::Op(op) => {
                let args: Vec<String> = node.children.iter().map(|&c| self.render(c)).collect();
                op.render(&args)
            }
            leaf => leaf.leaf_symbol().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::token::Operator;

    fn grammar() -> Grammar {
        // 0 Add, 1 Mul, 2 Sin, 3 X1, 4 X2, 5 C
        Grammar::new(&[Operator::Add, Operator::Mul, Operator::Sin], 2, true)
    }

    #[test]
    fn test_prefix_tree_rendering() {
        let g = grammar();
        // Add(Mul(C, X1), Sin(X2))
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[0, 1, 5, 3, 2, 4]).unwrap();
        assert!(tree.is_full());
        assert_eq!(tree.expression().unwrap(), "((C*X1)+sin(X2))");
        assert_eq!(tree.const_count(), 1);
        assert_eq!(tree.height(), 3);
    }

    #[test]
    fn test_level_tree_rendering() {
        let g = grammar();
        // Level order of Add(Mul(C, X1), Sin(X2)): Add, Mul, Sin, C, X1, X2
        let tree = ExprTree::from_tokens(BuildOrder::Level, &g, &[0, 1, 2, 5, 3, 4]).unwrap();
        assert!(tree.is_full());
        assert_eq!(tree.expression().unwrap(), "((C*X1)+sin(X2))");
        assert_eq!(tree.prefix_tokens(), vec![0, 1, 5, 3, 2, 4]);
        assert_eq!(tree.tokens(), vec![0, 1, 2, 5, 3, 4]);
    }

    #[test]
    fn test_prefix_roundtrip_through_level_export() {
        let g = grammar();
        let level = ExprTree::from_tokens(BuildOrder::Level, &g, &[1, 0, 2, 3, 5, 4]).unwrap();
        let prefix =
            ExprTree::from_tokens(BuildOrder::Prefix, &g, &level.prefix_tokens()).unwrap();
        assert_eq!(level.expression().unwrap(), prefix.expression().unwrap());
    }

    #[test]
    fn test_add_to_full_tree_fails() {
        let g = grammar();
        let mut tree = ExprTree::prefix();
        tree.add(g.token(3).unwrap()).unwrap();
        assert!(tree.is_full());
        assert_eq!(
            tree.add(g.token(4).unwrap()),
            Err(GrammarError::TreeFull(4))
        );
    }

    #[test]
    fn test_incomplete_expression() {
        let g = grammar();
        let tree = ExprTree::from_tokens(BuildOrder::Prefix, &g, &[0, 3]).unwrap();
        assert!(!tree.is_full());
        assert_eq!(tree.expression(), Err(GrammarError::Incomplete(1)));
        assert_eq!(ExprTree::prefix().expression(), Err(GrammarError::EmptyTree));
    }

    #[test]
    fn test_running_counts_prefix() {
        let g = grammar();
        let mut tree = ExprTree::prefix();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.head_token(), None);

        tree.add(g.token(2).unwrap()).unwrap(); // Sin
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.trig_count(), 1);
        assert_eq!(tree.head_token(), Some(TokenKind::Op(Operator::Sin)));

        tree.add(g.token(0).unwrap()).unwrap(); // Add under Sin
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.trig_count(), 1);
        assert_eq!(tree.head_token(), Some(TokenKind::Op(Operator::Add)));
    }

    #[test]
    fn test_running_counts_level() {
        let g = grammar();
        let mut tree = ExprTree::level();
        tree.add(g.token(0).unwrap()).unwrap(); // Add
        tree.add(g.token(2).unwrap()).unwrap(); // Sin as left child
        // Next slot is Add's right child, not Sin's child
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.trig_count(), 0);
        tree.add(g.token(3).unwrap()).unwrap(); // X1 as right child
        // Now Sin's child
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.trig_count(), 1);
        assert_eq!(tree.head_token(), Some(TokenKind::Op(Operator::Sin)));
    }

    #[test]
    fn test_unknown_token_in_sequence() {
        let g = grammar();
        assert!(matches!(
            ExprTree::from_tokens(BuildOrder::Prefix, &g, &[0, 42]),
            Err(GrammarError::UnknownToken { id: 42, .. })
        ));
    }
}
