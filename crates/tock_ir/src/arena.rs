//! Dense, ID-indexed storage for circuit graph entities.
//!
//! Signals, processes, memories, and chunk instances are appended to an
//! [`Arena`] during elaboration and never removed, so their IDs stay valid
//! for the lifetime of the design and of any simulation built from it.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An append-only container indexed by a typed ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the ID the next call to [`alloc`](Self::alloc) will hand out.
    pub fn next_id(&self) -> I {
        I::from_raw(self.items.len() as u32)
    }

    /// Appends an item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = self.next_id();
        self.items.push(item);
        id
    }

    /// Returns the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID was not allocated by this arena.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// Returns the item with the given ID, or `None` if it is out of bounds.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Returns a mutable reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID was not allocated by this arena.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterates mutably over items in allocation order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn ids_are_stable_and_sequential() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        let clk = arena.alloc("clk");
        let cnt = arena.alloc("cnt");
        assert_eq!(clk.as_raw(), 0);
        assert_eq!(cnt.as_raw(), 1);
        assert_eq!(arena[clk], "clk");
        assert_eq!(arena[cnt], "cnt");
    }

    #[test]
    fn next_id_predicts_alloc() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        let predicted = arena.next_id();
        let got = arena.alloc(7);
        assert_eq!(predicted, got);
    }

    #[test]
    fn try_get_out_of_bounds() {
        let arena: Arena<SignalId, u32> = Arena::new();
        assert!(arena.try_get(SignalId::from_raw(3)).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        let id = arena.alloc(1);
        *arena.get_mut(id) += 41;
        assert_eq!(arena[id], 42);
    }

    #[test]
    fn iter_preserves_order() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        arena.alloc("a");
        arena.alloc("b");
        let names: Vec<_> = arena.values().copied().collect();
        assert_eq!(names, vec!["a", "b"]);
        let ids: Vec<u32> = arena.iter().map(|(id, _)| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn serde_roundtrip() {
        let mut arena: Arena<SignalId, String> = Arena::new();
        arena.alloc("led".to_string());
        let json = serde_json::to_string(&arena).unwrap();
        let restored: Arena<SignalId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[SignalId::from_raw(0)], "led");
    }
}
