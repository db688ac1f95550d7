//! Integer handles and the slot table behind them.
//!
//! Index 0 of every table is a permanent sentinel, so a zeroed handle is always invalid.
//! There is no generation counter: once an index is reissued, an old copy of the handle
//! resolves to the new occupant.

macro_rules! slot_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u32);

        impl $name {
            /// The permanent invalid handle.
            pub const INVALID: Self = Self(0);

            /// Whether the handle is not the invalid sentinel.
            ///
            /// This does not mean the handle is live; ask the owning allocator.
            #[inline]
            pub fn is_valid(&self) -> bool {
                self.0 != 0
            }

            /// Get the raw index (for debugging and serialization).
            #[inline]
            pub fn raw(&self) -> u32 {
                self.0
            }

            /// Rebuild a handle from a raw index.
            #[inline]
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub(crate) fn index(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

slot_handle!(
    /// Handle to a buffer owned by a [`BufferAllocator`](crate::BufferAllocator).
    BufferHandle
);

slot_handle!(
    /// Handle to an image owned by a [`TransientResourceArena`](crate::TransientResourceArena).
    TransientImageHandle
);

/// State stored in a [`SlotTable`].
pub(crate) trait Slot: Default {
    /// Whether this slot currently holds a live resource.
    fn in_use(&self) -> bool;
}

/// A vector of slots with free-list recycling.
///
/// Slot 0 is reserved and never handed out.
pub(crate) struct SlotTable<S: Slot> {
    /// Allocation slots (index 0 is the sentinel)
    slots: Vec<S>,

    /// Free slot indices, reused LIFO
    free_list: Vec<u32>,
}

impl<S: Slot> SlotTable<S> {
    /// Create a table holding only the sentinel slot.
    pub fn new() -> Self {
        Self {
            slots: vec![S::default()],
            free_list: Vec::new(),
        }
    }

    /// Drop every slot and go back to only the sentinel.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.slots.push(S::default());
        self.free_list.clear();
    }

    /// Install a slot, reusing a freed index if one exists.
    pub fn insert(&mut self, slot: S) -> u32 {
        debug_assert!(slot.in_use());

        if let Some(index) = self.free_list.pop() {
            debug_assert!(!self.slots[index as usize].in_use());
            self.slots[index as usize] = slot;
            index
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(slot);
            index
        }
    }

    /// Index that the next [`SlotTable::insert`] will use.
    #[cfg(test)]
    pub fn next_index(&self) -> u32 {
        self.free_list.last().copied().unwrap_or(self.slots.len() as u32)
    }

    /// Get a live slot.
    pub fn get(&self, index: usize) -> Option<&S> {
        if index == 0 {
            return None;
        }
        self.slots.get(index).filter(|s| s.in_use())
    }

    /// Get a live slot mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut S> {
        if index == 0 {
            return None;
        }
        self.slots.get_mut(index).filter(|s| s.in_use())
    }

    /// Take a live slot out, leaving a zeroed slot and freeing the index.
    pub fn release(&mut self, index: usize) -> Option<S> {
        self.get(index)?;
        let slot = std::mem::take(&mut self.slots[index]);
        self.free_list.push(index as u32);
        Some(slot)
    }

    /// Indices of every live slot.
    pub fn live_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, s)| s.in_use())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.slots.iter().skip(1).filter(|s| s.in_use()).count()
    }

    /// Every slot past the sentinel, live or not. Used by the leak sweep.
    pub fn all_slots_mut(&mut self) -> impl Iterator<Item = (usize, &mut S)> {
        self.slots.iter_mut().enumerate().skip(1)
    }

    /// Total slot capacity including the sentinel.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of indices waiting for reuse.
    #[cfg(test)]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

impl<S: Slot> Default for SlotTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestSlot {
        value: u32,
        in_use: bool,
    }

    impl Slot for TestSlot {
        fn in_use(&self) -> bool {
            self.in_use
        }
    }

    fn live(value: u32) -> TestSlot {
        TestSlot { value, in_use: true }
    }

    #[test]
    fn test_sentinel_never_issued() {
        let mut table = SlotTable::new();
        assert_eq!(table.insert(live(1)), 1);
        assert_eq!(table.insert(live(2)), 2);
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_release_recycles_index() {
        let mut table = SlotTable::new();
        let a = table.insert(live(1));
        let _b = table.insert(live(2));

        let slot = table.release(a as usize).unwrap();
        assert_eq!(slot.value, 1);
        assert!(table.get(a as usize).is_none());
        assert_eq!(table.next_index(), a);

        // Same index, no generation: reissued numerically.
        assert_eq!(table.insert(live(3)), a);
        assert_eq!(table.get(a as usize).unwrap().value, 3);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut table = SlotTable::new();
        let a = table.insert(live(1));

        assert!(table.release(a as usize).is_some());
        assert!(table.release(a as usize).is_none());
        assert!(table.release(0).is_none());
        assert!(table.release(99).is_none());
        assert_eq!(table.free_count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut table = SlotTable::new();
        table.insert(live(1));
        table.insert(live(2));
        table.reset();

        assert_eq!(table.len(), 1);
        assert_eq!(table.live_count(), 0);
        assert_eq!(table.insert(live(5)), 1);
    }

    #[test]
    fn test_handle_sentinel() {
        assert!(!BufferHandle::INVALID.is_valid());
        assert!(!TransientImageHandle::default().is_valid());
        assert!(BufferHandle::from_raw(7).is_valid());
    }
}
