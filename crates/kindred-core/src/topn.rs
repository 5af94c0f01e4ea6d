//! Fixed-capacity best-of-N accumulation over (index, score) pairs.

use crate::Scored;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TopNError {
    #[error("accumulator is finalized and can no longer accept inserts")]
    Finalized,
}

// Ordered by score, then by recency: on equal scores the earlier insertion
// compares greater and is therefore retained longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    score: OrderedFloat<f64>,
    seq: Reverse<u64>,
    id: u32,
}

/// Bounded accumulator keeping the `capacity` greatest (id, score) pairs.
///
/// Lifecycle: create, fill via [`insert`](Self::insert), [`finalize`](Self::finalize)
/// once, then read in descending-score order. Inserting into a finalized
/// accumulator is an error.
///
/// Tie rule: an incoming pair whose score equals the current minimum is not
/// admitted; when an eviction must pick between entries sharing the minimum
/// score, the most recently inserted one is evicted. After finalization,
/// equal scores appear in insertion order. NaN scores sort greater than any
/// other value.
#[derive(Debug)]
pub struct BoundedTopN {
    capacity: usize,
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    sorted: Option<Vec<Scored>>,
}

impl BoundedTopN {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(1024)),
            next_seq: 0,
            sorted: None,
        }
    }

    /// Offers a pair. Returns whether it was admitted.
    pub fn insert(&mut self, idx: u32, score: f64) -> Result<bool, TopNError> {
        if self.sorted.is_some() {
            return Err(TopNError::Finalized);
        }
        if self.capacity == 0 {
            return Ok(false);
        }

        let entry = Entry {
            score: OrderedFloat(score),
            seq: Reverse(self.next_seq),
            id: idx,
        };
        self.next_seq += 1;

        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(entry));
            return Ok(true);
        }

        let admit = match self.heap.peek() {
            Some(Reverse(worst)) => entry > *worst,
            None => true,
        };
        if admit {
            self.heap.pop();
            self.heap.push(Reverse(entry));
        }
        Ok(admit)
    }

    /// Transitions to the read-only state, sorting retained pairs by
    /// descending score. Idempotent.
    pub fn finalize(&mut self) {
        if self.sorted.is_some() {
            return;
        }
        let mut entries: Vec<Entry> = self.heap.drain().map(|Reverse(e)| e).collect();
        entries.sort_unstable_by(|a, b| b.cmp(a));
        self.sorted = Some(
            entries
                .into_iter()
                .map(|e| Scored::new(e.id, e.score.0))
                .collect(),
        );
    }

    pub fn is_finalized(&self) -> bool {
        self.sorted.is_some()
    }

    pub fn len(&self) -> usize {
        match &self.sorted {
            Some(v) => v.len(),
            None => self.heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained pairs in descending-score order. Empty before finalization.
    pub fn as_slice(&self) -> &[Scored] {
        self.sorted.as_deref().unwrap_or(&[])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scored> {
        self.as_slice().iter()
    }

    /// Finalizes if necessary and returns the sorted pairs.
    pub fn into_sorted_vec(mut self) -> Vec<Scored> {
        self.finalize();
        self.sorted.unwrap_or_default()
    }
}
