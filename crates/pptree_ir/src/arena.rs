//! Generic arena for ID-indexed storage of IR entities.
//!
//! Entries are appended and may later be removed. Removal leaves a
//! tombstone so every other ID stays valid; iteration skips removed slots.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
///
/// Implementors must provide a bijection between `u32` indices and the ID type.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An ID-indexed container with stable IDs and tombstoned removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Arena<I: ArenaId, T> {
    slots: Vec<Option<T>>,
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
            slots: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(Some(item));
        id
    }

    /// Allocates an item built from the ID it is about to receive.
    pub fn alloc_with(&mut self, build: impl FnOnce(I) -> T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(Some(build(id)));
        id
    }

    /// Returns the item with the given ID, or `None` if it was removed or
    /// never allocated.
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.as_raw() as usize)?.as_ref()
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.as_raw() as usize)?.as_mut()
    }

    /// Removes an item, returning it. Its ID is never reused.
    pub fn remove(&mut self, id: I) -> Option<T> {
        self.slots.get_mut(id.as_raw() as usize)?.take()
    }

    /// Returns `true` if the ID refers to a live item.
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if the arena holds no live items.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Iterates over live `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Iterates over live `(ID, &mut T)` pairs in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|item| (I::from_raw(i as u32), item)))
    }

    /// Iterates over references to live items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the ID was removed or never allocated.
    fn index(&self, id: I) -> &T {
        match self.get(id) {
            Some(item) => item,
            None => panic!("arena index {} is not live", id.as_raw()),
        }
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        match self.get_mut(id) {
            Some(item) => item,
            None => panic!("arena index {} is not live", id.as_raw()),
        }
    }
}
