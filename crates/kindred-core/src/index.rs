//! Two-way mappings between external identifiers and dense integer indices.
//!
//! Index assignment is owned here, never by the preference store or the
//! similarity layer: those only ever see `u32` indices in `[0, count)`.

use std::collections::HashMap;
use std::hash::Hash;

/// Maps user identifiers to contiguous indices and back.
pub trait UserIndex<U> {
    fn uidx_of(&self, user: &U) -> Option<u32>;

    fn user_of(&self, uidx: u32) -> Option<&U>;

    fn num_users(&self) -> usize;
}

/// Maps item identifiers to contiguous indices and back.
pub trait ItemIndex<I> {
    fn iidx_of(&self, item: &I) -> Option<u32>;

    fn item_of(&self, iidx: u32) -> Option<&I>;

    fn num_items(&self) -> usize;
}

/// Hash-backed two-way index. Indices are assigned in first-seen order.
#[derive(Debug, Clone)]
pub struct IdIndex<T> {
    forward: Vec<T>,
    inverse: HashMap<T, u32>,
}

impl<T: Eq + Hash + Clone> IdIndex<T> {
    pub fn new() -> Self {
        Self {
            forward: Vec::new(),
            inverse: HashMap::new(),
        }
    }

    pub fn from_ids<It: IntoIterator<Item = T>>(ids: It) -> Self {
        let mut index = Self::new();
        for id in ids {
            index.add(id);
        }
        index
    }

    /// Registers an identifier, returning its index. Idempotent.
    pub fn add(&mut self, id: T) -> u32 {
        if let Some(&idx) = self.inverse.get(&id) {
            return idx;
        }
        let idx = self.forward.len() as u32;
        self.forward.push(id.clone());
        self.inverse.insert(id, idx);
        idx
    }

    pub fn index_of(&self, id: &T) -> Option<u32> {
        self.inverse.get(id).copied()
    }

    pub fn id_at(&self, idx: u32) -> Option<&T> {
        self.forward.get(idx as usize)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<T: Eq + Hash + Clone> Default for IdIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> UserIndex<T> for IdIndex<T> {
    fn uidx_of(&self, user: &T) -> Option<u32> {
        self.index_of(user)
    }

    fn user_of(&self, uidx: u32) -> Option<&T> {
        self.id_at(uidx)
    }

    fn num_users(&self) -> usize {
        self.len()
    }
}

impl<T: Eq + Hash + Clone> ItemIndex<T> for IdIndex<T> {
    fn iidx_of(&self, item: &T) -> Option<u32> {
        self.index_of(item)
    }

    fn item_of(&self, iidx: u32) -> Option<&T> {
        self.id_at(iidx)
    }

    fn num_items(&self) -> usize {
        self.len()
    }
}
