//! Keyed entity storage with stable typed identifiers.
//!
//! Entities reference each other by [`Id`], never by live reference, so a
//! relationship is a pair of identifier fields kept in step by the helpers
//! in [`graph`](crate::graph).
//!
//! Like a `SyncMap`, an [`Arena`] never creates entries implicitly: lookups
//! fail with [`RegistryError::NotFound`] and inserts refuse a key that is
//! already taken with [`RegistryError::Duplicate`].

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{RegistryError, RegistryResult};

/// Opaque identifier of an entity of type `T`.
///
/// Identifiers are never reused within one arena, so a stale `Id` of a
/// deleted entity cannot alias a newer one.
pub struct Id<T> {
    index: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn new(index: u64) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// An entity with a unique lookup key.
pub trait Keyed {
    /// Entity kind used in error messages.
    const KIND: &'static str;

    type Key: Ord + Clone + fmt::Debug;

    fn key(&self) -> Self::Key;

    fn label(&self) -> &str;
}

/// Owned collection of `T` with a unique-key index.
#[derive(Debug, Clone)]
pub struct Arena<T: Keyed> {
    next: u64,
    entries: BTreeMap<Id<T>, T>,
    index: BTreeMap<T::Key, Id<T>>,
}

impl<T: Keyed> Default for Arena<T> {
    fn default() -> Self {
        Self {
            next: 0,
            entries: BTreeMap::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<T: Keyed> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifier of the entity stored under `key`, if any.
    pub fn find<Q>(&self, key: &Q) -> Option<Id<T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.index.get(key).copied()
    }

    /// Like [`find`](Self::find) but fails with `NotFound`.
    pub fn require<Q>(&self, key: &Q) -> RegistryResult<Id<T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ToString + ?Sized,
    {
        self.find(key)
            .ok_or_else(|| RegistryError::not_found(T::KIND, key.to_string()))
    }

    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Entity behind `id`; a stale identifier is `NotFound`.
    pub fn at(&self, id: Id<T>) -> RegistryResult<&T> {
        self.entries
            .get(&id)
            .ok_or_else(|| RegistryError::not_found(T::KIND, format!("{id:?}")))
    }

    /// Mutable access. The key of the entity must not be changed through it.
    pub fn at_mut(&mut self, id: Id<T>) -> RegistryResult<&mut T> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| RegistryError::not_found(T::KIND, format!("{id:?}")))
    }

    /// Stores `value` under a fresh identifier, or fails with `Duplicate`
    /// without storing anything.
    pub fn insert(&mut self, value: T) -> RegistryResult<Id<T>> {
        let key = value.key();
        if self.index.contains_key(&key) {
            return Err(RegistryError::duplicate(T::KIND, value.label()));
        }
        let id = Id::new(self.next);
        self.next += 1;
        self.index.insert(key, id);
        self.entries.insert(id, value);
        Ok(id)
    }

    pub fn remove(&mut self, id: Id<T>) -> Option<T> {
        let value = self.entries.remove(&id)?;
        self.index.remove(&value.key());
        Some(value)
    }

    /// Entities in identifier (creation) order.
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    /// Labels of the entities behind `ids`, sorted.
    pub fn labels<'a>(&self, ids: impl IntoIterator<Item = &'a Id<T>>) -> Vec<String>
    where
        T: 'a,
    {
        let mut labels: Vec<String> = ids
            .into_iter()
            .filter_map(|id| self.entries.get(id))
            .map(|value| value.label().to_string())
            .collect();
        labels.sort();
        labels
    }
}
