use std::ops::{Index, IndexMut};
use std::{fmt, slice, vec};

const DEFAULT_CAPACITY: usize = 10;

/// A growable array with an explicit capacity policy.
///
/// Pushing onto a full array doubles the capacity, and `reserve` sets the capacity to exactly the
/// requested amount. The number of reallocations is tracked so the growth policy can be observed.
pub struct DynArray<T> {
    buf: Vec<T>,
    reallocations: usize,
}

impl<T> DynArray<T> {
    /// Creates an empty array with room for ten elements.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty array with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            reallocations: 0,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of elements the array can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// How many times the backing storage has been reallocated.
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Appends `value`, doubling the capacity first if the array is full.
    pub fn push_back(&mut self, value: T) {
        if self.buf.len() == self.buf.capacity() {
            let grown = (self.buf.capacity() * 2).max(DEFAULT_CAPACITY);
            self.set_capacity(grown);
        }
        self.buf.push(value);
    }

    /// Removes and returns the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        self.buf.pop()
    }

    /// Sets the capacity to exactly `capacity`.
    ///
    /// Does nothing if the capacity is already `capacity` or if `capacity` is smaller than the
    /// current length.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity == self.buf.capacity() || capacity < self.buf.len() {
            return;
        }
        self.set_capacity(capacity);
    }

    /// Shrinks the capacity to the current length.
    pub fn shrink(&mut self) {
        self.reserve(self.buf.len());
    }

    /// Removes all elements, keeping the capacity.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Shortens the array to `len` elements, dropping the rest.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// The first element.
    pub fn front(&self) -> Option<&T> {
        self.buf.first()
    }

    /// The last element.
    pub fn back(&self) -> Option<&T> {
        self.buf.last()
    }

    /// The first element, mutably.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.buf.first_mut()
    }

    /// The last element, mutably.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.buf.last_mut()
    }

    /// The element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.buf.get(index)
    }

    /// The element at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.buf.get_mut(index)
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buf
    }

    /// Iterates over the elements in index order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.buf.iter()
    }

    /// Iterates mutably over the elements in index order.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.buf.iter_mut()
    }

    fn set_capacity(&mut self, capacity: usize) {
        let mut buf = Vec::with_capacity(capacity);
        buf.append(&mut self.buf);
        self.buf = buf;
        self.reallocations += 1;
    }
}

impl<T: Default> DynArray<T> {
    /// Resizes to `len` elements, filling new slots with `T::default()`.
    ///
    /// Grows the capacity to exactly `len` if needed.
    pub fn resize(&mut self, len: usize) {
        if len > self.buf.capacity() {
            self.set_capacity(len);
        }
        self.buf.resize_with(len, T::default);
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for DynArray<T> {
    /// Copies the elements into a buffer of the same capacity.
    fn clone(&self) -> Self {
        let mut buf = Vec::with_capacity(self.buf.capacity());
        buf.extend_from_slice(&self.buf);
        Self {
            buf,
            reallocations: self.reallocations,
        }
    }
}

impl<T: PartialEq> PartialEq for DynArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.buf == other.buf
    }
}

impl<T: Eq> Eq for DynArray<T> {}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.buf.iter()).finish()
    }
}

impl<T> Index<usize> for DynArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.buf[index]
    }
}

impl<T> IndexMut<usize> for DynArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.buf[index]
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T> Extend<T> for DynArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> IntoIterator for DynArray<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buf.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buf.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DynArray<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buf.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_doubles() {
        let mut array = DynArray::new();
        assert_eq!(array.capacity(), 10);
        for i in 0..11 {
            array.push_back(i);
        }
        assert_eq!(array.capacity(), 20);
        assert_eq!(array.reallocations(), 1);
        for i in 11..41 {
            array.push_back(i);
        }
        assert_eq!(array.capacity(), 80);
        assert_eq!(array.reallocations(), 3);
        assert!(array.iter().copied().eq(0..41));
    }

    #[test]
    fn reserve_is_exact_and_ignores_shrinking_below_len() {
        let mut array: DynArray<u8> = (0..5).collect();
        array.reserve(3);
        assert_eq!(array.capacity(), 10);
        array.reserve(7);
        assert_eq!(array.capacity(), 7);
        let before = array.reallocations();
        array.reserve(7);
        assert_eq!(array.reallocations(), before);
        array.shrink();
        assert_eq!(array.capacity(), 5);
        assert_eq!(array.as_slice(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn resize_fills_with_default() {
        let mut array: DynArray<i32> = DynArray::with_capacity(2);
        array.push_back(7);
        array.resize(4);
        assert_eq!(array.as_slice(), &[7, 0, 0, 0]);
        assert_eq!(array.capacity(), 4);
        array.resize(1);
        assert_eq!(array.as_slice(), &[7]);
        array.clear();
        assert!(array.is_empty());
    }

    #[test]
    fn empty_capacity_grows_to_default() {
        let mut array = DynArray::with_capacity(0);
        array.push_back(1);
        assert_eq!(array.capacity(), 10);
    }

    #[test]
    fn clone_keeps_capacity() {
        let mut array: DynArray<u32> = (0..15).collect();
        let copy = array.clone();
        assert_eq!(copy.capacity(), array.capacity());
        assert_eq!(copy.reallocations(), 1);
        array.push_back(15);
        assert_eq!(array.reallocations(), 1);
        assert_eq!(copy.as_slice(), &array.as_slice()[..15]);
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds_panics() {
        let array: DynArray<i32> = DynArray::new();
        let _ = array[0];
    }
}
