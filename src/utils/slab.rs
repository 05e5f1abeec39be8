//! Generational arena used for task storage and pending reactor operations.
//!
//! Every insertion hands out a [`Key`] made of a slot index and the slot's
//! generation. Removing a value bumps the generation, so a key that outlived
//! its value can never resolve to whatever is stored in the slot next.

use std::fmt;

/// Opaque reference to a value stored in a [`Slab`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Key {
    index: u32,
    generation: u32,
}

impl Key {
    /// Packs the key into a poller token.
    pub(crate) fn to_token(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub(crate) fn from_token(token: u64) -> Self {
        Self {
            index: token as u32,
            generation: (token >> 32) as u32,
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

enum Slot<T> {
    Vacant { generation: u32 },
    Occupied { generation: u32, value: T },
}

pub(crate) struct Slab<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Slab<T> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn insert(&mut self, value: T) -> Key {
        self.insert_with(|_| value)
    }

    /// Inserts a value built from the key it is about to be stored under.
    pub(crate) fn insert_with(&mut self, build: impl FnOnce(Key) -> T) -> Key {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::Vacant { generation: 0 });
                self.slots.len() - 1
            }
        };

        // Free list only ever holds vacant slots.
        let generation = match self.slots[index] {
            Slot::Vacant { generation } | Slot::Occupied { generation, .. } => generation,
        };

        let key = Key {
            index: index as u32,
            generation,
        };

        self.slots[index] = Slot::Occupied {
            generation,
            value: build(key),
        };
        self.len += 1;

        key
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        match self.slots.get(key.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.slots.get_mut(key.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub(crate) fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// Removes the value behind `key`, invalidating every copy of the key.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let index = key.index as usize;
        if !self.contains(key) {
            return None;
        }

        let next = Slot::Vacant {
            generation: key.generation.wrapping_add(1),
        };

        match std::mem::replace(&mut self.slots[index], next) {
            Slot::Occupied { value, .. } => {
                self.free.push(index);
                self.len -= 1;
                Some(value)
            }
            Slot::Vacant { .. } => None,
        }
    }

    /// Takes every stored value out with the key it was stored under,
    /// leaving the slab empty.
    pub(crate) fn drain(&mut self) -> Vec<(Key, T)> {
        let mut values = Vec::with_capacity(self.len);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied { generation, .. } = *slot {
                let next = Slot::Vacant {
                    generation: generation.wrapping_add(1),
                };
                if let Slot::Occupied { value, .. } = std::mem::replace(slot, next) {
                    let key = Key {
                        index: index as u32,
                        generation,
                    };
                    values.push((key, value));
                    self.free.push(index);
                }
            }
        }

        self.len = 0;
        values
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut slab = Slab::new();
        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_eq!(slab.get(a), Some(&"a"));
        assert_eq!(slab.get(b), Some(&"b"));
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn removed_key_is_stale_after_reuse() {
        let mut slab = Slab::new();
        let first = slab.insert(1);
        assert_eq!(slab.remove(first), Some(1));

        let second = slab.insert(2);
        assert_ne!(first, second, "reused slot must get a new generation");
        assert_eq!(slab.get(first), None);
        assert_eq!(slab.remove(first), None);
        assert_eq!(slab.get(second), Some(&2));
    }

    #[test]
    fn double_remove_is_a_no_op() {
        let mut slab = Slab::new();
        let key = slab.insert(String::from("x"));

        assert!(slab.remove(key).is_some());
        assert!(slab.remove(key).is_none());
        assert!(slab.is_empty());
    }

    #[test]
    fn token_round_trip_keeps_generation() {
        let mut slab = Slab::new();
        let key = slab.insert(());
        slab.remove(key);
        let key = slab.insert(());

        assert_eq!(Key::from_token(key.to_token()), key);
    }

    #[test]
    fn drain_invalidates_everything() {
        let mut slab = Slab::new();
        let keys: Vec<_> = (0..4usize).map(|i| slab.insert(i)).collect();

        let drained = slab.drain();
        assert!(drained.iter().all(|(key, value)| keys[*value] == *key));
        let mut values: Vec<_> = drained.into_iter().map(|(_, value)| value).collect();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3]);
        assert!(slab.is_empty());
        assert!(keys.iter().all(|k| !slab.contains(*k)));

        let fresh = slab.insert(9);
        assert!(!keys.contains(&fresh));
    }
}
