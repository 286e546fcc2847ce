//! Fixed-capacity binary heap with O(1) membership and in-place priority refresh.
//!
//! Items are ordered like [`std::collections::BinaryHeap`]: the greatest item by [`Ord`] is popped
//! first. Each item carries a key below the heap's capacity; the heap keeps the current slot of every
//! key it holds, which is what makes [`Heap::contains`] and [`Heap::refresh_item`] cheap.

/// An item that can be stored in a [`Heap`].
pub trait HeapItem: Ord {
    /// Identity of the item. Must be unique among live items and below the heap capacity.
    fn heap_key(&self) -> usize;
}

const NOT_IN_HEAP: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct Heap<T: HeapItem> {
    items: Vec<T>,
    // Slot in `items` for every key, `NOT_IN_HEAP` when absent.
    slots: Vec<usize>,
}

impl<T: HeapItem> Heap<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Heap {
            items: Vec::with_capacity(capacity),
            slots: vec![NOT_IN_HEAP; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts `item` and sifts it up.
    ///
    /// # Panics
    /// When the heap is full, when the key is outside the capacity, or when the key is already present.
    pub fn add(&mut self, item: T) {
        let key = item.heap_key();
        assert!(
            self.items.len() < self.capacity(),
            "Heap capacity of {} exceeded",
            self.capacity()
        );
        assert!(
            key < self.capacity(),
            "Heap key {key} out of range for capacity {}",
            self.capacity()
        );
        assert!(!self.contains(key), "Heap key {key} added twice");

        let slot = self.items.len();
        self.items.push(item);
        self.slots[key] = slot;
        self.sift_up(slot);
    }

    /// Removes and returns the greatest item.
    pub fn pop_first(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }

        let popped = self.items.swap_remove(0);
        self.slots[popped.heap_key()] = NOT_IN_HEAP;

        if !self.items.is_empty() {
            self.slots[self.items[0].heap_key()] = 0;
            self.sift_down(0);
        }

        Some(popped)
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn contains(&self, key: usize) -> bool {
        self.slots.get(key).is_some_and(|&slot| slot != NOT_IN_HEAP)
    }

    pub fn get(&self, key: usize) -> Option<&T> {
        match self.slots.get(key) {
            Some(&slot) if slot != NOT_IN_HEAP => Some(&self.items[slot]),
            _ => None,
        }
    }

    /// Replaces the stored item with the same key and sifts it up.
    ///
    /// Only sifts up: `item` must rank at least as high as the one it replaces.
    /// Returns `false` if no item with that key is in the heap.
    pub fn refresh_item(&mut self, item: T) -> bool {
        let Some(&slot) = self.slots.get(item.heap_key()) else {
            return false;
        };

        if slot == NOT_IN_HEAP {
            return false;
        }

        debug_assert!(
            item >= self.items[slot],
            "refresh_item can only raise an item's priority"
        );

        self.items[slot] = item;
        self.sift_up(slot);
        true
    }

    /// Empties the heap, keeping its allocation. O(len).
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            self.slots[item.heap_key()] = NOT_IN_HEAP;
        }
    }

    /// Grows or shrinks the key space. The heap must be empty.
    pub fn reset_capacity(&mut self, capacity: usize) {
        assert!(self.is_empty(), "Heap must be empty to change capacity");

        self.slots.clear();
        self.slots.resize(capacity, NOT_IN_HEAP);
        self.items.reserve(capacity);
    }

    /// Items in backing order, root first.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.items[slot] <= self.items[parent] {
                break;
            }

            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.items.len();
        loop {
            let left = slot * 2 + 1;
            let right = left + 1;

            if left >= len {
                return;
            }

            let mut child = left;
            if right < len && self.items[right] > self.items[left] {
                child = right;
            }

            if self.items[slot] >= self.items[child] {
                return;
            }

            self.swap(slot, child);
            slot = child;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.slots[self.items[a].heap_key()] = a;
        self.slots[self.items[b].heap_key()] = b;
    }
}
