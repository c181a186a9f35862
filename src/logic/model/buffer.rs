//! Rolling Window - Bounded FIFO history
//!
//! Fixed-capacity queue: pushing past capacity evicts the oldest entry.
//! Backs the threshold manager's score and outcome history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingWindow<T> {
    /// A capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting from the front. Returns the number evicted.
    pub fn push(&mut self, item: T) -> usize {
        self.items.push_back(item);
        let mut evicted = 0;
        while self.items.len() > self.capacity {
            self.items.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> usize {
        items.into_iter().map(|item| self.push(item)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            current_size: self.items.len(),
            capacity: self.capacity,
            is_full: self.is_full(),
            fill_percent: (self.items.len() as f32 / self.capacity as f32 * 100.0).min(100.0),
        }
    }
}

/// Buffer status information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub is_full: bool,
    pub fill_percent: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut window = RollingWindow::new(3);

        assert_eq!(window.extend([1, 2, 3]), 0);
        assert!(window.is_full());
        assert_eq!(window.push(4), 1);
        assert_eq!(window.to_vec(), vec![2, 3, 4]);

        assert_eq!(window.extend([5, 6, 7, 8]), 4);
        assert_eq!(window.to_vec(), vec![6, 7, 8]);
    }

    #[test]
    fn test_status() {
        let mut window = RollingWindow::new(4);
        window.push(0.5);

        let status = window.status();
        assert_eq!(status.current_size, 1);
        assert_eq!(status.capacity, 4);
        assert!(!status.is_full);
        assert_eq!(status.fill_percent, 25.0);

        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_capacity() {
        let mut window = RollingWindow::new(0);
        window.extend([1, 2]);
        assert_eq!(window.to_vec(), vec![2]);
    }
}
