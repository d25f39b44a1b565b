//! Unordered collection with O(1) removal by position
//!
//! Removal swaps the last element into the freed slot, so iteration order
//! is not stable. Used for edge lists and tile buckets, which change far
//! more often than they are iterated in any particular order.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastRemoveVec<T> {
    items: Vec<T>,
}

impl<T: PartialEq> FastRemoveVec<T> {
    pub fn new() -> Self {
        FastRemoveVec { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Removes the first element equal to `item`
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|t| t == item) {
            Some(index) => {
                self.items.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Takes all elements, leaving the collection empty
    pub fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.items.drain(..)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> Default for FastRemoveVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: PartialEq> IntoIterator for &'a FastRemoveVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
