//! Deduplicated pool of discovered expressions

use std::collections::HashSet;

/// Highest-reward prefix token sequences found by the search
#[derive(Clone, Debug, Default)]
pub struct ExpressionPool {
    entries: Vec<(f64, Vec<usize>)>,
    seen: HashSet<Vec<usize>>,
}

impl ExpressionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sequence unless it is already pooled
    pub fn insert(&mut self, reward: f64, tokens: Vec<usize>) -> bool {
        if self.seen.contains(&tokens) {
            return false;
        }
        self.seen.insert(tokens.clone());
        self.entries.push((reward, tokens));
        true
    }

    /// Keep only the `capacity` highest rewards
    pub fn truncate(&mut self, capacity: usize) {
        if self.entries.len() <= capacity {
            return;
        }
        self.sort();
        for (_, tokens) in self.entries.drain(capacity..) {
            self.seen.remove(&tokens);
        }
    }

    /// Drain the pool, best reward first
    pub fn take(&mut self) -> Vec<Vec<usize>> {
        self.sort();
        self.seen.clear();
        self.entries.drain(..).map(|(_, tokens)| tokens).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    /// `(reward, tokens)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &(f64, Vec<usize>)> {
        self.entries.iter()
    }

    fn sort(&mut self) {
        self.entries.sort_by(|x, y| y.0.total_cmp(&x.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplicates() {
        let mut pool = ExpressionPool::new();
        assert!(pool.insert(0.5, vec![1, 2, 3]));
        assert!(!pool.insert(0.9, vec![1, 2, 3]));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_truncate_keeps_best() {
        let mut pool = ExpressionPool::new();
        pool.insert(0.1, vec![1]);
        pool.insert(0.7, vec![2]);
        pool.insert(0.4, vec![3]);
        pool.truncate(2);
        assert_eq!(pool.len(), 2);
        // evicted sequences may come back
        assert!(pool.insert(0.2, vec![1]));
        assert_eq!(pool.take(), vec![vec![2], vec![3], vec![1]]);
        assert!(pool.is_empty());
    }
}
