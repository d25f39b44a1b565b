//! Array-backed binary min-heap with in-place key decrease
//!
//! `std::collections::BinaryHeap` cannot reorder an element whose priority
//! changed, so the usual A* workaround is to push duplicates and skip stale
//! pops. The open list here keeps one entry per item instead: an improved
//! item is located (linear scan) and percolated up in place.

/// Min-heap of `(key, item)` pairs ordered by `key`
#[derive(Debug, Clone)]
pub struct IndexedMinHeap<K, T> {
    entries: Vec<(K, T)>,
}

impl<K: PartialOrd + Copy, T: PartialEq + Copy> IndexedMinHeap<K, T> {
    pub fn new() -> Self {
        IndexedMinHeap { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries but keeps the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push(&mut self, key: K, item: T) {
        self.entries.push((key, item));
        let last = self.entries.len() - 1;
        self.percolate_up(last);
    }

    pub fn pop(&mut self) -> Option<(K, T)> {
        if self.entries.is_empty() {
            return None;
        }
        let top = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.percolate_down(0);
        }
        Some(top)
    }

    /// Position of `item` in the backing array (O(n))
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.entries.iter().position(|(_, t)| t == item)
    }

    /// Lower the key of an existing item. Returns false if the item is not
    /// queued or the new key is not smaller.
    pub fn decrease_key(&mut self, item: &T, key: K) -> bool {
        match self.index_of(item) {
            Some(index) if key < self.entries[index].0 => {
                self.entries[index].0 = key;
                self.percolate_up(index);
                true
            }
            _ => false,
        }
    }

    fn percolate_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[index].0 < self.entries[parent].0 {
                self.entries.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn percolate_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.entries[left].0 < self.entries[smallest].0 {
                smallest = left;
            }
            if right < len && self.entries[right].0 < self.entries[smallest].0 {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.entries.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<K: PartialOrd + Copy, T: PartialEq + Copy> Default for IndexedMinHeap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
