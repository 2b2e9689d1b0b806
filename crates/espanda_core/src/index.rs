//! Index-based arenas.
//!
//! Every long-lived compiler object (AST nodes, scopes, variables, types)
//! lives in a `Vec` owned by its phase and is addressed by a small integer
//! id. Ids are plain `Copy` values, so they can key hash maps, cross thread
//! boundaries and be serialized without any pointer lifetime concerns.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed `u32` handle into an [`IndexArena`].
pub trait ArenaIndex: Copy + Eq {
    fn from_usize(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Declare a `u32` newtype implementing [`ArenaIndex`].
///
/// The generated type has an `INVALID` sentinel (`u32::MAX`) for slots that
/// have not been filled yet.
#[macro_export]
macro_rules! define_index {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(pub u32);

        impl $name {
            pub const INVALID: $name = $name(u32::MAX);

            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl $crate::index::ArenaIndex for $name {
            #[inline]
            fn from_usize(index: usize) -> Self {
                debug_assert!(index < u32::MAX as usize);
                $name(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $crate::__serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: $crate::__serde::Serializer,
            {
                serializer.serialize_u32(self.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

/// A growable arena whose entries are addressed by a typed index.
///
/// Entries are never removed, so an index handed out once stays valid for
/// the lifetime of the arena.
pub struct IndexArena<I, T> {
    items: Vec<T>,
    _marker: PhantomData<fn(I) -> I>,
}

impl<I: ArenaIndex, T> IndexArena<I, T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// The index the next `alloc` will return.
    #[inline]
    pub fn next_index(&self) -> I {
        I::from_usize(self.items.len())
    }

    /// Store a value and return its index.
    #[inline]
    pub fn alloc(&mut self, value: T) -> I {
        let id = self.next_index();
        self.items.push(value);
        id
    }

    /// Store a value that needs to know its own index.
    #[inline]
    pub fn alloc_with(&mut self, make: impl FnOnce(I) -> T) -> I {
        let id = self.next_index();
        self.items.push(make(id));
        id
    }

    #[inline]
    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterate `(index, value)` pairs in allocation order.
    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_usize(i), item))
    }

    pub fn indices(&self) -> impl Iterator<Item = I> {
        (0..self.items.len()).map(I::from_usize)
    }
}

impl<I: ArenaIndex, T> Default for IndexArena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaIndex, T: Clone> Clone for IndexArena<I, T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            _marker: PhantomData,
        }
    }
}

impl<I, T: fmt::Debug> fmt::Debug for IndexArena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<I: ArenaIndex, T> Index<I> for IndexArena<I, T> {
    type Output = T;

    #[inline]
    fn index(&self, id: I) -> &T {
        &self.items[id.index()]
    }
}

impl<I: ArenaIndex, T> IndexMut<I> for IndexArena<I, T> {
    #[inline]
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    define_index! {
        struct TestId;
    }

    #[test]
    fn test_alloc_returns_sequential_ids() {
        let mut arena: IndexArena<TestId, &str> = IndexArena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!(a, TestId(0));
        assert_eq!(b, TestId(1));
        assert_eq!(arena[b], "b");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_alloc_with_sees_own_id() {
        let mut arena: IndexArena<TestId, TestId> = IndexArena::new();
        arena.alloc(TestId::INVALID);
        let id = arena.alloc_with(|id| id);
        assert_eq!(arena[id], id);
        assert!(!arena[TestId(0)].is_valid());
    }

    #[test]
    fn test_iter_enumerated() {
        let mut arena: IndexArena<TestId, u8> = IndexArena::new();
        arena.alloc(10);
        arena.alloc(20);
        let pairs: Vec<_> = arena.iter_enumerated().map(|(i, v)| (i.0, *v)).collect();
        assert_eq!(pairs, vec![(0, 10), (1, 20)]);
    }
}
