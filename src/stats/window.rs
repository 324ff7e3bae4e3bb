//! Bounded FIFO of raw counts

use crate::estimator::Samples;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Sliding window over the most recent raw counts of one stream.
///
/// Storage is allocated once at full capacity; when full, each push evicts
/// the oldest count before appending, so the buffer never grows.
#[derive(Debug, Clone)]
pub struct StreamWindow {
    buf: VecDeque<u32>,
    capacity: usize,
}

impl StreamWindow {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `raw`, returning the evicted count if the window was full
    pub fn push(&mut self, raw: u32) -> Option<u32> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(raw);
        evicted
    }

    /// Contents in arrival order without copying
    pub fn samples(&self) -> Samples<'_> {
        let (front, back) = self.buf.as_slices();
        Samples::new(front, back)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.buf.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.buf.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(capacity: usize) -> StreamWindow {
        StreamWindow::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_fills_then_evicts_oldest() {
        let mut w = window(3);
        assert!(w.is_empty());

        assert_eq!(w.push(1), None);
        assert_eq!(w.push(2), None);
        assert_eq!(w.push(3), None);
        assert!(w.is_full());

        assert_eq!(w.push(4), Some(1));
        assert_eq!(w.push(5), Some(2));
        assert_eq!(w.to_vec(), vec![3, 4, 5]);
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn test_keeps_last_capacity_values() {
        let mut w = window(50);
        for raw in 0..1_000u32 {
            w.push(raw);
            assert!(w.len() <= 50);
        }

        let expected: Vec<u32> = (950..1_000).collect();
        assert_eq!(w.to_vec(), expected);
        assert_eq!(w.samples().iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_no_growth_in_steady_state() {
        let mut w = window(300);
        for raw in 0..300u32 {
            w.push(raw);
        }
        let allocated = w.buf.capacity();

        for raw in 0..10_000u32 {
            w.push(raw % 7);
        }
        assert_eq!(w.buf.capacity(), allocated);
        assert_eq!(w.capacity(), 300);
    }

    #[test]
    fn test_capacity_one() {
        let mut w = window(1);
        w.push(8);
        assert_eq!(w.push(9), Some(8));
        assert_eq!(w.to_vec(), vec![9]);
    }
}
