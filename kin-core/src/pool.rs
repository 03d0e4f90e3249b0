//! Slot-plus-generation entity pools.

use kin_types::RawHandle;

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A dense slot array with a free-list stack and generation counters.
///
/// Deleting an entry bumps its slot's generation, so outstanding handles
/// for the old occupant go stale instead of aliasing the next one.
/// Iteration walks the dense slots in order and skips vacancies, which
/// keeps per-step traversal deterministic.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// An empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool has no live entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots (live or vacant); the exclusive upper bound of all
    /// live slot indices.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Insert a value, reusing a vacant slot when one exists.
    pub fn insert(&mut self, value: T) -> RawHandle {
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.value = Some(value);
                RawHandle::new(slot, entry.generation)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 1,
                    value: Some(value),
                });
                RawHandle::new(slot, 1)
            }
        }
    }

    /// Remove an entry, bumping the slot's generation. Returns the value,
    /// or `None` for a stale handle.
    pub fn remove(&mut self, handle: RawHandle) -> Option<T> {
        let entry = self.slots.get_mut(handle.slot() as usize)?;
        if entry.generation != handle.generation() {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1).max(1);
        self.free.push(handle.slot());
        self.len -= 1;
        Some(value)
    }

    /// Whether the handle addresses a live entry.
    #[must_use]
    pub fn contains(&self, handle: RawHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, handle: RawHandle) -> Option<&T> {
        let entry = self.slots.get(handle.slot() as usize)?;
        if entry.generation != handle.generation() {
            return None;
        }
        entry.value.as_ref()
    }

    /// Look up an entry mutably.
    pub fn get_mut(&mut self, handle: RawHandle) -> Option<&mut T> {
        let entry = self.slots.get_mut(handle.slot() as usize)?;
        if entry.generation != handle.generation() {
            return None;
        }
        entry.value.as_mut()
    }

    /// Look up the live entry at a slot index, with its handle.
    #[must_use]
    pub fn get_at(&self, slot: usize) -> Option<(RawHandle, &T)> {
        let entry = self.slots.get(slot)?;
        let value = entry.value.as_ref()?;
        Some((RawHandle::new(slot as u32, entry.generation), value))
    }

    /// Iterate live entries in dense slot order.
    pub fn iter(&self) -> impl Iterator<Item = (RawHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (RawHandle::new(slot as u32, entry.generation), value))
        })
    }

    /// Iterate live entries mutably in dense slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RawHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, entry)| {
                let generation = entry.generation;
                entry
                    .value
                    .as_mut()
                    .map(move |value| (RawHandle::new(slot as u32, generation), value))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut pool = Pool::new();
        let a = pool.insert("a");
        let b = pool.insert("b");
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.remove(a), Some("a"));
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&"b"));
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut pool = Pool::new();
        let first = pool.insert(1);
        pool.remove(first);
        let second = pool.insert(2);
        assert_eq!(first.slot(), second.slot());
        assert_ne!(first.generation(), second.generation());
        assert!(!pool.contains(first));
        assert_eq!(pool.get(second), Some(&2));
        // Stale removal is a no-op.
        assert_eq!(pool.remove(first), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_iteration_is_dense_slot_order() {
        let mut pool = Pool::new();
        let a = pool.insert("a");
        let _b = pool.insert("b");
        let _c = pool.insert("c");
        pool.remove(a);
        let values: Vec<_> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["b", "c"]);
        // Reused slot comes back in its slot position.
        pool.insert("d");
        let values: Vec<_> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["d", "b", "c"]);
    }
}
