//! Search statistics tree
//!
//! Nodes live in a contiguous arena and refer to each other by [`NodeId`].
//! The parent link is only walked upwards during backpropagation; children
//! are owned through the arena.

use rand::seq::SliceRandom;
use rand::Rng;

/// Index into the node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// Statistics for one tree prefix
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Parent node (NONE for root)
    pub parent: NodeId,

    /// `(token id, child)` pairs, `None` until expanded
    pub children: Option<Vec<(usize, NodeId)>>,

    /// Largest reward backpropagated through this node
    pub max_value: f64,

    /// Number of times a simulation stepped into this node
    pub visits: u32,
}

impl SearchNode {
    fn new(parent: NodeId) -> Self {
        Self {
            parent,
            children: None,
            max_value: f64::NEG_INFINITY,
            visits: 0,
        }
    }
}

/// Arena-backed search tree with a movable cursor
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    current: NodeId,
    min_visits: u32,
}

impl SearchTree {
    /// Fresh tree holding only the root
    pub fn new(min_visits: usize) -> Self {
        Self {
            nodes: vec![SearchNode::new(NodeId::NONE)],
            current: NodeId(0),
            min_visits: u32::try_from(min_visits).unwrap_or(u32::MAX),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0 as usize]
    }

    fn allocate(&mut self, node: SearchNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Number of nodes in the arena
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Move the cursor back to the root
    pub fn rewind(&mut self) {
        self.current = self.root();
    }

    #[inline]
    pub fn current(&self) -> NodeId {
        self.current
    }

    #[inline]
    pub fn set_current(&mut self, id: NodeId) {
        self.current = id;
    }

    /// Whether the node under the cursor has children
    pub fn is_expanded(&self) -> bool {
        self.get(self.current).children.is_some()
    }

    /// Give the node under the cursor one child per token in `actions`
    pub fn expand(&mut self, actions: &[usize]) {
        let parent = self.current;
        let children = actions
            .iter()
            .map(|&action| (action, self.allocate(SearchNode::new(parent))))
            .collect();
        self.get_mut(parent).children = Some(children);
    }

    fn child(&self, action: usize) -> Option<NodeId> {
        self.get(self.current)
            .children
            .as_ref()?
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, id)| *id)
    }

    /// Move the cursor to the child for `action` and count the visit
    ///
    /// A missing child is created on the spot. Returns the child's visit
    /// count after the step.
    pub fn step(&mut self, action: usize) -> u32 {
        let id = match self.child(action) {
            Some(id) => id,
            None => {
                let parent = self.current;
                let id = self.allocate(SearchNode::new(parent));
                self.get_mut(parent)
                    .children
                    .get_or_insert_with(Vec::new)
                    .push((action, id));
                id
            }
        };
        self.current = id;
        let node = self.get_mut(id);
        node.visits += 1;
        node.visits
    }

    /// Uniform pick among children visited fewer than `min_visits` times
    pub fn choose_under_visited<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let candidates: Vec<usize> = self
            .get(self.current)
            .children
            .as_ref()?
            .iter()
            .filter(|(_, id)| self.get(*id).visits < self.min_visits)
            .map(|(action, _)| *action)
            .collect();
        candidates.choose(rng).copied()
    }

    /// Child with the highest running maximum, first one on ties
    pub fn choose_best(&self) -> Option<usize> {
        let children = self.get(self.current).children.as_ref()?;
        let mut best: Option<(usize, f64)> = None;
        for &(action, id) in children {
            let value = self.get(id).max_value;
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((action, value));
            }
        }
        best.map(|(action, _)| action)
    }

    /// Raise the running maximum from the cursor up to the root
    pub fn backpropagate(&mut self, value: f64) {
        let mut id = self.current;
        while id.is_some() {
            let node = self.get_mut(id);
            if value > node.max_value {
                node.max_value = value;
            }
            id = node.parent;
        }
    }
}
