//! Double Q-learning bandit
//!
//! One [`QNode`] per visited prefix, each holding two independent action-value
//! estimates. Nodes are arena-allocated and created lazily the first time an
//! action is learned or stepped through.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::config::MctsConfig;

#[derive(Debug, Clone)]
struct QNode {
    a: Vec<f64>,
    b: Vec<f64>,
    children: Vec<Option<usize>>,
}

impl QNode {
    fn new(actions: usize) -> Self {
        Self {
            a: vec![0.0; actions],
            b: vec![0.0; actions],
            children: vec![None; actions],
        }
    }
}

fn max_value(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Action-value table shared across search rounds
#[derive(Debug, Clone)]
pub struct DoubleQTable {
    nodes: Vec<QNode>,
    current: usize,
    actions: usize,
    learning_rate: f64,
    discount: f64,
    epsilon: f64,
}

impl DoubleQTable {
    /// Empty table over `actions` tokens
    pub fn new(actions: usize, config: &MctsConfig) -> Self {
        Self {
            nodes: vec![QNode::new(actions)],
            current: 0,
            actions,
            learning_rate: config.q_learning_rate,
            discount: config.q_learning_discount,
            epsilon: config.q_learning_epsilon,
        }
    }

    /// Number of tokens the table is sized for
    pub fn actions(&self) -> usize {
        self.actions
    }

    /// Number of allocated bandit nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget everything learned
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0] = QNode::new(self.actions);
        self.current = 0;
    }

    /// Move the cursor back to the root
    pub fn rewind(&mut self) {
        self.current = 0;
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn set_current(&mut self, node: usize) {
        self.current = node;
    }

    fn ensure_child(&mut self, action: usize) -> usize {
        if let Some(child) = self.nodes[self.current].children[action] {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(QNode::new(self.actions));
        self.nodes[self.current].children[action] = Some(child);
        child
    }

    /// Move the cursor to the successor for `action`
    pub fn step(&mut self, action: usize) {
        self.current = self.ensure_child(action);
    }

    /// `(A, B)` estimates for `action` at the cursor
    pub fn values(&self, action: usize) -> (f64, f64) {
        let node = &self.nodes[self.current];
        (node.a[action], node.b[action])
    }

    /// Pick an action among `available`
    ///
    /// With probability epsilon the pick is a softmax sample over `A + B`;
    /// otherwise it is uniform.
    pub fn choose_action<R: Rng>(&self, available: &[usize], rng: &mut R) -> Option<usize> {
        if available.is_empty() {
            return None;
        }
        if rng.gen::<f64>() < self.epsilon {
            let node = &self.nodes[self.current];
            let combined: Vec<f64> = available.iter().map(|&i| node.a[i] + node.b[i]).collect();
            let top = max_value(&combined);
            let weights: Vec<f64> = combined.iter().map(|v| (v - top).exp()).collect();
            if let Ok(dist) = WeightedIndex::new(&weights) {
                return Some(available[dist.sample(rng)]);
            }
        }
        available.choose(rng).copied()
    }

    /// Double Q-learning update for `action` at the cursor
    ///
    /// A fair coin picks the estimator to update; the other one supplies the
    /// bootstrap value at the successor unless the step is terminal.
    pub fn learn<R: Rng>(&mut self, action: usize, reward: f64, terminal: bool, rng: &mut R) {
        let child = self.ensure_child(action);
        let update_a = rng.gen_bool(0.5);
        let target = if terminal {
            reward
        } else {
            let successor = &self.nodes[child];
            let other = if update_a { &successor.b } else { &successor.a };
            reward + self.discount * max_value(other)
        };
        let lr = self.learning_rate;
        let node = &mut self.nodes[self.current];
        let estimate = if update_a {
            &mut node.a[action]
        } else {
            &mut node.b[action]
        };
        *estimate += lr * (target - *estimate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(lr: f64, epsilon: f64) -> DoubleQTable {
        let config = MctsConfig {
            q_learning_rate: lr,
            q_learning_epsilon: epsilon,
            ..MctsConfig::default()
        };
        DoubleQTable::new(4, &config)
    }

    #[test]
    fn test_terminal_updates_converge_to_reward() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut q = table(0.5, 0.6);
        for _ in 0..200 {
            q.learn(2, 0.8, true, &mut rng);
        }
        let (a, b) = q.values(2);
        assert!((a - 0.8).abs() < 1e-6);
        assert!((b - 0.8).abs() < 1e-6);
        assert_eq!(q.values(1), (0.0, 0.0));
    }

    #[test]
    fn test_bootstrap_uses_successor() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut q = table(1.0, 0.6);
        q.step(0);
        for _ in 0..20 {
            q.learn(1, 1.0, true, &mut rng);
        }
        q.rewind();
        for _ in 0..20 {
            q.learn(0, -0.1, false, &mut rng);
        }
        let (a, b) = q.values(0);
        // -0.1 + 0.95 * 1.0
        assert!((a - 0.85).abs() < 1e-9);
        assert!((b - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_choose_action_respects_available() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut q = table(1.0, 1.0);
        q.learn(0, 50.0, true, &mut rng);
        for _ in 0..100 {
            let action = q.choose_action(&[1, 3], &mut rng).unwrap();
            assert!(action == 1 || action == 3);
        }
        assert_eq!(q.choose_action(&[], &mut rng), None);
    }

    #[test]
    fn test_softmax_prefers_high_values() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut q = table(1.0, 1.0);
        for _ in 0..10 {
            q.learn(3, 10.0, true, &mut rng);
        }
        let hits = (0..200)
            .filter(|_| q.choose_action(&[0, 1, 2, 3], &mut rng) == Some(3))
            .count();
        assert!(hits > 190);
    }

    #[test]
    fn test_clear_and_cursor() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut q = table(0.5, 0.6);
        q.step(1);
        q.step(2);
        assert_eq!(q.len(), 3);
        let mark = q.current();
        q.rewind();
        q.set_current(mark);
        q.learn(0, 1.0, true, &mut rng);
        q.clear();
        assert_eq!(q.len(), 1);
        assert_eq!(q.current(), 0);
        assert_eq!(q.values(0), (0.0, 0.0));
    }
}
